//! Records returned by the ledger gateway and the client seam the
//! dispatcher talks through.

use std::future::Future;

use alloy::primitives::Bytes;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Ledger-level status of a transaction; only zero is success.
pub const TX_STATUS_SUCCESS: i32 = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub key: String,
    pub value: Bytes,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractResult {
    pub code: i32,
    #[serde(default)]
    pub result: Bytes,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub gas_used: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub contract_result: ContractResult,
    #[serde(default)]
    pub tx_id: String,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code == TX_STATUS_SUCCESS
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default)]
    pub chain_id: String,
    pub tx_id: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub contract_name: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<KeyValuePair>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub member_info: Bytes,
    #[serde(default)]
    pub signature: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResult {
    pub code: i32,
    #[serde(default)]
    pub contract_result: ContractResult,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub payload: Payload,
    pub sender: Sender,
    #[serde(default)]
    pub result: TxResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerBlockHeader {
    pub block_height: u64,
    pub block_hash: Bytes,
    #[serde(default)]
    pub pre_block_hash: Bytes,
    #[serde(default)]
    pub tx_root: Bytes,
    #[serde(default)]
    pub block_timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerBlock {
    pub header: LedgerBlockHeader,
    #[serde(default)]
    pub txs: Vec<LedgerTransaction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub block: LedgerBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub transaction: LedgerTransaction,
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: Bytes,
    #[serde(default)]
    pub tx_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionProof {
    pub transaction_info: TransactionInfo,
    #[serde(default)]
    pub merkle_path: Bytes,
}

/// Native deployment or upgrade request forwarded by `CREATE_CONTRACT` and
/// `UPGRADE_CONTRACT`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractManagePayload {
    pub contract_name: String,
    #[serde(default)]
    pub version: String,
    pub byte_code: Bytes,
    #[serde(default)]
    pub parameters: Vec<KeyValuePair>,
    pub upgrade: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndorsementEntry {
    pub member_info: Bytes,
    pub signature: Bytes,
}

/// Native ledger RPC surface. Implementations must tolerate concurrent
/// in-flight requests.
pub trait LedgerClient: Send + Sync + 'static {
    fn query_contract(
        &self,
        contract_name: &str,
        method: &str,
        parameters: Vec<KeyValuePair>,
    ) -> impl Future<Output = Result<TxResponse>> + Send;

    fn invoke_contract(
        &self,
        contract_name: &str,
        method: &str,
        parameters: Vec<KeyValuePair>,
    ) -> impl Future<Output = Result<TxResponse>> + Send;

    fn get_block_by_height(&self, height: u64) -> impl Future<Output = Result<BlockInfo>> + Send;

    fn get_current_block_height(&self) -> impl Future<Output = Result<u64>> + Send;

    fn get_tx_by_tx_id(&self, tx_id: &str) -> impl Future<Output = Result<TransactionInfo>> + Send;

    fn get_merkle_path_by_tx_id(&self, tx_id: &str) -> impl Future<Output = Result<Bytes>> + Send;

    fn send_contract_manage_request(
        &self,
        payload: ContractManagePayload,
        endorsements: Vec<EndorsementEntry>,
    ) -> impl Future<Output = Result<TxResponse>> + Send;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sol_types::WeCrossProxy::getPathsCall;
    use alloy::{
        hex,
        sol_types::{SolCall, SolValue},
    };
    use anyhow::anyhow;
    use std::{
        collections::HashMap,
        sync::{Mutex, MutexGuard},
    };

    pub(crate) type RecordedCall = (String, String, Vec<KeyValuePair>);

    #[derive(Default)]
    struct State {
        calls: Vec<RecordedCall>,
        paths: Vec<String>,
        paths_fail: bool,
        contract_response: TxResponse,
        manage_response: TxResponse,
        height: u64,
        blocks: HashMap<u64, BlockInfo>,
        transactions: HashMap<String, TransactionInfo>,
    }

    /// In-memory ledger answering from canned state.
    #[derive(Default)]
    pub(crate) struct MockLedger {
        state: Mutex<State>,
    }

    impl MockLedger {
        fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap()
        }

        pub(crate) fn calls(&self) -> Vec<RecordedCall> {
            self.state().calls.clone()
        }

        pub(crate) fn set_paths(&self, paths: &[&str]) {
            let mut state = self.state();
            state.paths = paths.iter().map(|p| p.to_string()).collect();
            state.paths_fail = false;
        }

        pub(crate) fn fail_paths(&self) {
            self.state().paths_fail = true;
        }

        pub(crate) fn set_height(&self, height: u64) {
            self.state().height = height;
        }

        pub(crate) fn set_contract_response(&self, response: TxResponse) {
            self.state().contract_response = response;
        }

        pub(crate) fn set_manage_response(&self, response: TxResponse) {
            self.state().manage_response = response;
        }

        pub(crate) fn add_block(&self, block: BlockInfo) {
            self.state()
                .blocks
                .insert(block.block.header.block_height, block);
        }

        pub(crate) fn add_transaction(&self, info: TransactionInfo) {
            self.state()
                .transactions
                .insert(info.transaction.payload.tx_id.clone(), info);
        }

        fn contract(
            &self,
            contract_name: &str,
            method: &str,
            parameters: Vec<KeyValuePair>,
        ) -> TxResponse {
            let mut state = self.state();
            state
                .calls
                .push((contract_name.to_string(), method.to_string(), parameters));
            if method != hex::encode_prefixed(getPathsCall::SELECTOR) {
                return state.contract_response.clone();
            }
            if state.paths_fail {
                return TxResponse {
                    code: 1,
                    message: "contract not found".to_string(),
                    ..Default::default()
                };
            }
            TxResponse {
                contract_result: ContractResult {
                    result: state.paths.abi_encode().into(),
                    ..Default::default()
                },
                ..Default::default()
            }
        }
    }

    impl LedgerClient for MockLedger {
        async fn query_contract(
            &self,
            contract_name: &str,
            method: &str,
            parameters: Vec<KeyValuePair>,
        ) -> Result<TxResponse> {
            Ok(self.contract(contract_name, method, parameters))
        }

        async fn invoke_contract(
            &self,
            contract_name: &str,
            method: &str,
            parameters: Vec<KeyValuePair>,
        ) -> Result<TxResponse> {
            Ok(self.contract(contract_name, method, parameters))
        }

        async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo> {
            self.state()
                .blocks
                .get(&height)
                .cloned()
                .ok_or_else(|| anyhow!("block {height} not found"))
        }

        async fn get_current_block_height(&self) -> Result<u64> {
            Ok(self.state().height)
        }

        async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo> {
            self.state()
                .transactions
                .get(tx_id)
                .cloned()
                .ok_or_else(|| anyhow!("transaction {tx_id} not found"))
        }

        async fn get_merkle_path_by_tx_id(&self, tx_id: &str) -> Result<Bytes> {
            Ok(Bytes::copy_from_slice(tx_id.as_bytes()))
        }

        async fn send_contract_manage_request(
            &self,
            _payload: ContractManagePayload,
            _endorsements: Vec<EndorsementEntry>,
        ) -> Result<TxResponse> {
            Ok(self.state().manage_response.clone())
        }
    }

    #[test]
    fn test_ledger_records_json() {
        let response = TxResponse {
            code: 0,
            tx_id: "tx1".to_string(),
            contract_result: ContractResult {
                result: Bytes::from_static(&[1, 2]),
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["contractResult"]["result"], "0x0102");
        assert_eq!(json["txId"], "tx1");
        let back: TxResponse = serde_json::from_value(json).unwrap();
        assert!(back.is_success());
        assert_eq!(back, response);
    }

    #[test]
    fn test_minimal_block_json() {
        let block: BlockInfo = serde_json::from_str(
            r#"{"block":{"header":{"blockHeight":3,"blockHash":"0xaa"}}}"#,
        )
        .unwrap();
        assert_eq!(block.block.header.block_height, 3);
        assert!(block.block.txs.is_empty());
    }
}
