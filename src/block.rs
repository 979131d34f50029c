use alloy::hex;
use anyhow::Result;
use tracing::{debug, warn};

use crate::{
    abi::{self, ContractAbi},
    account::IdentityResolver,
    constants::NO_XA_TRANSACTION_ID,
    ledger::{BlockInfo, LedgerBlockHeader, LedgerTransaction, TX_STATUS_SUCCESS},
    properties::PropertyStore,
    protocol::from_hex_param,
    proxy::{ProxyCall, ProxyVariant, unwrap_proxy_output},
    structs::{Block, BlockHeader, CanonicalTransaction},
};

/// Rebuilds canonical transactions from ledger blocks by reversing the proxy
/// encoding, using the connection's ABIs to name and decode inner calls.
pub struct BlockTransactionParser<'a> {
    properties: &'a PropertyStore,
    identity: &'a dyn IdentityResolver,
}

impl<'a> BlockTransactionParser<'a> {
    pub fn new(properties: &'a PropertyStore, identity: &'a dyn IdentityResolver) -> Self {
        Self {
            properties,
            identity,
        }
    }

    pub fn parse_block(&self, info: &BlockInfo, only_header: bool) -> Result<Block> {
        let header = convert_header(&info.block.header);
        debug!(
            "block number: {}, hash: {}, {} transactions",
            header.number,
            header.hash,
            info.block.txs.len()
        );
        let mut block = Block {
            header,
            ..Default::default()
        };
        if only_header {
            return Ok(block);
        }
        block.transaction_hashes = info
            .block
            .txs
            .iter()
            .map(|tx| tx.payload.tx_id.clone())
            .collect();
        for tx in &info.block.txs {
            let transaction =
                self.parse_transaction(tx, block.header.number, block.header.timestamp)?;
            block.transactions_with_detail.push(transaction);
        }
        Ok(block)
    }

    pub fn parse_transaction(
        &self,
        tx: &LedgerTransaction,
        block_number: u64,
        timestamp: u64,
    ) -> Result<CanonicalTransaction> {
        let mut transaction = CanonicalTransaction {
            tx_id: tx.payload.tx_id.clone(),
            account_identity: self.identity.resolve(&tx.sender.member_info)?,
            error_code: tx.result.code,
            message: tx.result.message.clone(),
            cross_chain_tx_id: NO_XA_TRANSACTION_ID.to_string(),
            block_number,
            timestamp,
            tx_bytes: serde_json::to_vec(tx)?.into(),
            ..Default::default()
        };

        let Some(call) = proxy_call(tx) else {
            return Ok(transaction);
        };
        transaction.by_proxy = true;
        if let Some(xa_transaction_id) = call.xa_transaction_id() {
            transaction.cross_chain_tx_id = xa_transaction_id.to_string();
        }
        transaction.cross_chain_seq = call.seq();

        if let Err(e) = self.decode_inner_call(tx, &call, &mut transaction) {
            warn!("failed to decode proxied call of tx {}: {e:#}", transaction.tx_id);
            transaction.method = None;
            transaction.args.clear();
            transaction.result.clear();
        }
        Ok(transaction)
    }

    /// Fills resource, method, args and result from the inner call. ABI
    /// drift only logs; malformed call data is an error for this transaction.
    fn decode_inner_call(
        &self,
        tx: &LedgerTransaction,
        call: &ProxyCall,
        transaction: &mut CanonicalTransaction,
    ) -> Result<()> {
        let resource = call.resource()?;
        transaction.resource = Some(resource.clone());
        let selector = call.inner_selector()?;

        let Some(abi_json) = self.properties.abi(&resource) else {
            warn!("no ABI for resource {resource}, tx: {}", transaction.tx_id);
            return Ok(());
        };
        let contract_abi = match ContractAbi::parse(&abi_json) {
            Ok(contract_abi) => contract_abi,
            Err(e) => {
                warn!("bad ABI for resource {resource}, tx: {}: {e:#}", transaction.tx_id);
                return Ok(());
            }
        };
        let Some(function) = contract_abi.function_by_selector(selector) else {
            warn!(
                "maybe ABI of {resource} is upgraded, no function for selector {}",
                hex::encode_prefixed(selector)
            );
            return Ok(());
        };
        transaction.method = Some(function.name.clone());
        transaction.args = abi::decode_args(function, call.inner_args())?;

        if tx.result.code == TX_STATUS_SUCCESS && !function.outputs.is_empty() {
            let output = unwrap_proxy_output(&tx.result.contract_result.result)?;
            transaction.result = abi::decode_result(function, &output)?;
        }
        Ok(())
    }
}

/// The proxy call carried by the transaction's first parameter, if any.
fn proxy_call(tx: &LedgerTransaction) -> Option<ProxyCall> {
    let param = tx.payload.parameters.first()?;
    let input = from_hex_param(&param.value).ok()?;
    match ProxyCall::decode(&input, &ProxyVariant::ALL) {
        Ok(call) => call,
        Err(e) => {
            warn!(
                "tx {} matches a proxy selector but does not decode: {e:#}",
                tx.payload.tx_id
            );
            None
        }
    }
}

pub fn convert_header(header: &LedgerBlockHeader) -> BlockHeader {
    BlockHeader {
        number: header.block_height,
        hash: hex::encode(&header.block_hash),
        prev_hash: (!header.pre_block_hash.is_empty()).then(|| hex::encode(&header.pre_block_hash)),
        transaction_root: hex::encode(&header.tx_root),
        timestamp: header.block_timestamp,
    }
}
