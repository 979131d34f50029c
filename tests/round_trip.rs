use std::sync::{Arc, Mutex};

use alloy::{
    hex,
    primitives::{Bytes, keccak256},
    signers::local::PrivateKeySigner,
    sol_types::SolValue,
};
use anyhow::{Result, anyhow};
use xchain_connector_rs::{
    Account, Driver, LedgerClient, LedgerConnection, Path, PropertyStore, StatusCode,
    TransactionContext, TransactionRequest,
    constants::{PROPERTY_CHAIN_ID, PROXY_CONTRACT_NAME, XA_TRANSACTION_ID},
    ledger::{
        BlockInfo, ContractManagePayload, ContractResult, EndorsementEntry, KeyValuePair,
        LedgerBlock, LedgerBlockHeader, LedgerTransaction, Payload, Sender, TransactionInfo,
        TransactionProof, TxResponse, TxResult,
    },
    proxy::ProxyVariant,
};

const PROXY_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
const TOKEN_ADDRESS: &str = "0x2222222222222222222222222222222222222222";
const RECIPIENT: &str = "0xabcabcabcabcabcabcabcabcabcabcabcabcabca";
const TOKEN_ABI: &str = r#"[
    {"type":"function","name":"transfer","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]}
]"#;

/// Packs every invoked transaction into block 1 and answers with the
/// return value `true`, wrapped the way the proxy wraps it.
#[derive(Default)]
struct RecordingLedger {
    txs: Mutex<Vec<LedgerTransaction>>,
}

impl RecordingLedger {
    fn execute(&self, contract_name: &str, parameters: Vec<KeyValuePair>) -> TxResponse {
        let mut txs = self.txs.lock().unwrap();
        let tx_id = format!("tx-{}", txs.len());
        let result: Bytes = if contract_name == PROXY_ADDRESS {
            Bytes::from(true.abi_encode()).abi_encode().into()
        } else {
            true.abi_encode().into()
        };
        let contract_result = ContractResult {
            result,
            ..Default::default()
        };
        txs.push(LedgerTransaction {
            payload: Payload {
                tx_id: tx_id.clone(),
                contract_name: contract_name.to_string(),
                parameters,
                ..Default::default()
            },
            sender: Sender {
                member_info: Bytes::from_static(b"alice"),
                ..Default::default()
            },
            result: TxResult {
                code: 0,
                contract_result: contract_result.clone(),
                message: "SUCCESS".to_string(),
            },
        });
        TxResponse {
            code: 0,
            message: "SUCCESS".to_string(),
            contract_result,
            tx_id,
        }
    }

    fn block(&self) -> BlockInfo {
        BlockInfo {
            block: LedgerBlock {
                header: LedgerBlockHeader {
                    block_height: 1,
                    block_hash: Bytes::copy_from_slice(keccak256(b"block-1").as_slice()),
                    pre_block_hash: Bytes::copy_from_slice(keccak256(b"block-0").as_slice()),
                    block_timestamp: 1_700_000_000,
                    ..Default::default()
                },
                txs: self.txs.lock().unwrap().clone(),
            },
        }
    }
}

impl LedgerClient for RecordingLedger {
    async fn query_contract(
        &self,
        _contract_name: &str,
        _method: &str,
        _parameters: Vec<KeyValuePair>,
    ) -> Result<TxResponse> {
        Err(anyhow!("queries are not recorded"))
    }

    async fn invoke_contract(
        &self,
        contract_name: &str,
        _method: &str,
        parameters: Vec<KeyValuePair>,
    ) -> Result<TxResponse> {
        Ok(self.execute(contract_name, parameters))
    }

    async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo> {
        if height != 1 {
            return Err(anyhow!("block {height} not found"));
        }
        Ok(self.block())
    }

    async fn get_current_block_height(&self) -> Result<u64> {
        Ok(1)
    }

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo> {
        let block = self.block();
        let transaction = block
            .block
            .txs
            .into_iter()
            .find(|tx| tx.payload.tx_id == tx_id)
            .ok_or_else(|| anyhow!("transaction {tx_id} not found"))?;
        Ok(TransactionInfo {
            transaction,
            block_height: 1,
            ..Default::default()
        })
    }

    async fn get_merkle_path_by_tx_id(&self, _tx_id: &str) -> Result<Bytes> {
        Ok(Bytes::new())
    }

    async fn send_contract_manage_request(
        &self,
        _payload: ContractManagePayload,
        _endorsements: Vec<EndorsementEntry>,
    ) -> Result<TxResponse> {
        Err(anyhow!("contract management is not supported"))
    }
}

fn connection() -> LedgerConnection<RecordingLedger> {
    let properties = PropertyStore::new();
    properties.insert(PROXY_CONTRACT_NAME, PROXY_ADDRESS);
    properties.insert(PROPERTY_CHAIN_ID, "chain1");
    properties.insert("token", TOKEN_ADDRESS);
    properties.add_abi("token", TOKEN_ABI);
    LedgerConnection::new(RecordingLedger::default(), Arc::new(properties))
}

fn context() -> TransactionContext {
    TransactionContext::new(
        Path::new("payment", "chain1", "token"),
        Some(Account::public_key("alice", PrivateKeySigner::random())),
    )
}

fn transfer() -> TransactionRequest {
    TransactionRequest::new("transfer", vec![RECIPIENT.to_string(), "100".to_string()])
        .with_option(XA_TRANSACTION_ID, "0")
}

#[tokio::test]
async fn test_transfer_by_proxy_end_to_end() {
    let connection = connection();
    let driver = Driver::default();

    let response = driver
        .send_transaction(&context(), &transfer(), true, &connection)
        .await
        .unwrap();
    assert_eq!(response.error_code, StatusCode::Success.code());
    assert_eq!(response.result, vec!["true"]);
    assert_eq!(response.hash, "tx-0");

    let block = connection.client().block();
    let payload = &block.block.txs[0].payload;
    assert_eq!(payload.contract_name, PROXY_ADDRESS);
    let calldata = hex::decode(std::str::from_utf8(&payload.parameters[0].value).unwrap()).unwrap();
    assert_eq!(&calldata[..4], ProxyVariant::Send.selector().as_slice());
}

#[tokio::test]
async fn test_block_reconstruction() {
    let connection = connection();
    let driver = Driver::default();
    driver
        .send_transaction(&context(), &transfer(), true, &connection)
        .await
        .unwrap();
    driver
        .send_transaction(&context(), &transfer(), false, &connection)
        .await
        .unwrap();

    assert_eq!(driver.get_block_number(&connection).await.unwrap(), 1);
    let block = driver.get_block(1, false, &connection).await.unwrap();
    assert_eq!(block.header.number, 1);
    assert_eq!(block.header.hash, hex::encode(keccak256(b"block-1")));
    assert_eq!(block.transaction_hashes, vec!["tx-0", "tx-1"]);
    assert!(!block.raw_bytes.is_empty());

    let proxied = &block.transactions_with_detail[0];
    assert!(proxied.by_proxy);
    assert_eq!(proxied.resource.as_deref(), Some("token"));
    assert_eq!(proxied.method.as_deref(), Some("transfer"));
    assert_eq!(proxied.args, vec![RECIPIENT, "100"]);
    assert_eq!(proxied.result, vec!["true"]);

    let native = &block.transactions_with_detail[1];
    assert!(!native.by_proxy);
    assert_eq!(native.resource, None);
    assert_eq!(native.method, None);

    let transaction = driver.get_transaction("tx-0", 1, &connection).await.unwrap();
    assert_eq!(transaction.tx_id, proxied.tx_id);
    assert_eq!(transaction.method, proxied.method);
    assert_eq!(transaction.args, proxied.args);
    assert_eq!(transaction.block_number, 1);
    assert!(driver.get_transaction("tx-0", 2, &connection).await.is_err());
}

#[tokio::test]
async fn test_failed_dispatch_becomes_exception() {
    let connection = connection();
    let err = Driver::default()
        .call(&context(), &transfer(), true, &connection)
        .await
        .unwrap_err();
    assert_eq!(err.error_code, StatusCode::HandleCallRequestFailed.code());
    assert!(err.message.contains("queries are not recorded"));
}

#[tokio::test]
async fn test_transaction_proof_round_trip() {
    let connection = connection();
    let driver = Driver::default();
    driver
        .send_transaction(&context(), &transfer(), true, &connection)
        .await
        .unwrap();
    let response = connection
        .send(xchain_connector_rs::Request::new(
            xchain_connector_rs::RequestType::GetTransactionProof,
            b"tx-0".to_vec(),
        ))
        .await;
    assert!(response.is_success());
    let proof: TransactionProof = serde_json::from_slice(&response.data).unwrap();
    assert_eq!(proof.transaction_info.block_height, 1);
    assert_eq!(proof.transaction_info.transaction.payload.tx_id, "tx-0");
}
