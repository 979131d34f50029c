use alloy::{
    primitives::Bytes,
    rpc::client::{ClientBuilder, RpcClient},
};
use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::{
    constants::{
        RPC_GET_BLOCK_BY_HEIGHT, RPC_GET_CURRENT_BLOCK_HEIGHT, RPC_GET_MERKLE_PATH_BY_TX_ID,
        RPC_GET_TX_BY_TX_ID, RPC_INVOKE_CONTRACT, RPC_QUERY_CONTRACT,
        RPC_SEND_CONTRACT_MANAGE_REQUEST,
    },
    ledger::{
        BlockInfo, ContractManagePayload, EndorsementEntry, KeyValuePair, LedgerClient,
        TransactionInfo, TxResponse,
    },
};

/// [`LedgerClient`] speaking JSON-RPC to a ledger gateway over HTTP.
#[derive(Debug, Clone)]
pub struct RpcLedgerClient {
    client: RpcClient,
}

impl RpcLedgerClient {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    pub fn connect_http(url: &str) -> Result<Self> {
        let url: Url = url.parse().with_context(|| format!("invalid RPC url {url}"))?;
        Ok(Self::new(ClientBuilder::default().http(url)))
    }
}

impl LedgerClient for RpcLedgerClient {
    async fn query_contract(
        &self,
        contract_name: &str,
        method: &str,
        parameters: Vec<KeyValuePair>,
    ) -> Result<TxResponse> {
        debug!("query contract {contract_name} method {method}");
        let params = json!([contract_name, method, parameters]);
        Ok(self.client.request(RPC_QUERY_CONTRACT, params).await?)
    }

    async fn invoke_contract(
        &self,
        contract_name: &str,
        method: &str,
        parameters: Vec<KeyValuePair>,
    ) -> Result<TxResponse> {
        debug!("invoke contract {contract_name} method {method}");
        let params = json!([contract_name, method, parameters]);
        Ok(self.client.request(RPC_INVOKE_CONTRACT, params).await?)
    }

    async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo> {
        let params = json!([height, false]);
        Ok(self.client.request(RPC_GET_BLOCK_BY_HEIGHT, params).await?)
    }

    async fn get_current_block_height(&self) -> Result<u64> {
        Ok(self
            .client
            .request_noparams(RPC_GET_CURRENT_BLOCK_HEIGHT)
            .await?)
    }

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo> {
        let params = json!([tx_id]);
        Ok(self.client.request(RPC_GET_TX_BY_TX_ID, params).await?)
    }

    async fn get_merkle_path_by_tx_id(&self, tx_id: &str) -> Result<Bytes> {
        let params = json!([tx_id]);
        Ok(self.client.request(RPC_GET_MERKLE_PATH_BY_TX_ID, params).await?)
    }

    async fn send_contract_manage_request(
        &self,
        payload: ContractManagePayload,
        endorsements: Vec<EndorsementEntry>,
    ) -> Result<TxResponse> {
        debug!(
            "contract manage request for {} with {} endorsements",
            payload.contract_name,
            endorsements.len()
        );
        let params = json!([payload, endorsements]);
        Ok(self
            .client
            .request(RPC_SEND_CONTRACT_MANAGE_REQUEST, params)
            .await?)
    }
}
