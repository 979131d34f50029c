pub mod block;
pub mod encode;
pub mod resources;
pub mod verify;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use xchain_connector_rs::{LedgerConnection, PropertyStore, RpcLedgerClient};

use crate::Config;

/// Connection over the configured RPC endpoint, with the ABIs under
/// `ROOT_PATH` registered when it is set.
pub fn connect(config: &Config) -> Result<LedgerConnection<RpcLedgerClient>> {
    let properties = properties(config)?;
    let client = RpcLedgerClient::connect_http(&config.connection.rpc_url)?;
    info!("connected to {}", config.connection.rpc_url);
    let connection = LedgerConnection::new(client, Arc::new(properties));
    if !connection.has_proxy_deployed() {
        warn!("WeCrossProxy address not configured, proxied requests will fail");
    }
    if !connection.has_hub_deployed() {
        warn!("WeCrossHub address not configured");
    }
    Ok(connection)
}

pub fn properties(config: &Config) -> Result<PropertyStore> {
    let properties = PropertyStore::from_config(&config.connection);
    if let Some(root) = &config.connection.root_path {
        properties.load_abi_dir(root)?;
    }
    Ok(properties)
}
