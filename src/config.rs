use std::{env, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{RESOURCE_WATCH_INITIAL_DELAY, RESOURCE_WATCH_PERIOD};

/// Static settings a connection is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub chain_id: String,
    pub auth_type: String,
    pub stub_type: String,
    #[serde(default)]
    pub crypto_hash: String,
    #[serde(default)]
    pub proxy_address: Option<String>,
    #[serde(default)]
    pub hub_address: Option<String>,
    #[serde(default)]
    pub root_path: Option<String>,
    pub rpc_url: String,
}

impl ConnectionConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            chain_id: required("CHAIN_ID")?,
            auth_type: required("AUTH_TYPE")?,
            stub_type: required("STUB_TYPE")?,
            crypto_hash: env::var("CRYPTO_HASH").unwrap_or_else(|_| "SHA256".to_string()),
            proxy_address: env::var("PROXY_ADDRESS").ok(),
            hub_address: env::var("HUB_ADDRESS").ok(),
            root_path: env::var("ROOT_PATH").ok(),
            rpc_url: required("RPC_URL")?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

/// Timing of the background resource watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSchedule {
    pub initial_delay: Duration,
    pub period: Duration,
}

impl Default for WatchSchedule {
    fn default() -> Self {
        Self {
            initial_delay: RESOURCE_WATCH_INITIAL_DELAY,
            period: RESOURCE_WATCH_PERIOD,
        }
    }
}
