use std::time::Duration;

// Property store keys
pub const PROXY_CONTRACT_NAME: &str = "WeCrossProxy";
pub const HUB_CONTRACT_NAME: &str = "WeCrossHub";
pub const PROPERTY_CHAIN_ID: &str = "CHAIN_ID";
pub const PROPERTY_AUTH_TYPE: &str = "AUTH_TYPE";
pub const PROPERTY_STUB_TYPE: &str = "STUB_TYPE";
pub const PROPERTY_CRYPTO_HASH: &str = "CRYPTO_HASH";
pub const PROPERTY_ROOT_PATH: &str = "ROOT_PATH";
pub const PROPERTY_ABI_SUFFIX: &str = "_ABI";

/// Key under which the EVM calldata travels in `contractMethodParams`.
pub const CONTRACT_ARGS_EVM_PARAM: &str = "data";

// Request option keys
pub const XA_TRANSACTION_ID: &str = "XA_TRANSACTION_ID";
pub const XA_TRANSACTION_SEQ: &str = "XA_TRANSACTION_SEQ";
pub const TRANSACTION_UNIQUE_ID: &str = "TRANSACTION_UNIQUE_ID";

/// Value of the cross-chain transaction id meaning "no transaction".
pub const NO_XA_TRANSACTION_ID: &str = "0";

/// "0x" + the offset word + the length word that precede the payload of a
/// single `bytes` return value, as hex characters.
pub const PROXY_OUTPUT_HEADER_HEX_LEN: usize = 130;

pub const EVM_CONTRACT_DIR: &str = "contracts/evm";

pub const RESOURCE_WATCH_INITIAL_DELAY: Duration = Duration::from_secs(10);
pub const RESOURCE_WATCH_PERIOD: Duration = Duration::from_secs(30);

// JSON-RPC method names served by the ledger gateway
pub const RPC_QUERY_CONTRACT: &str = "chain_queryContract";
pub const RPC_INVOKE_CONTRACT: &str = "chain_invokeContract";
pub const RPC_GET_BLOCK_BY_HEIGHT: &str = "chain_getBlockByHeight";
pub const RPC_GET_CURRENT_BLOCK_HEIGHT: &str = "chain_getCurrentBlockHeight";
pub const RPC_GET_TX_BY_TX_ID: &str = "chain_getTxByTxId";
pub const RPC_GET_MERKLE_PATH_BY_TX_ID: &str = "chain_getMerklePathByTxId";
pub const RPC_SEND_CONTRACT_MANAGE_REQUEST: &str = "chain_sendContractManageRequest";
