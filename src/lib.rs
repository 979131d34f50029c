pub mod abi;
pub mod account;
pub mod block;
pub mod config;
pub mod connection;
pub mod constants;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod properties;
pub mod protocol;
pub mod proxy;
pub mod revert;
pub mod rpc;
pub mod sol_types;
pub mod structs;

pub use account::{Account, IdentityResolver, KeccakIdentityResolver};
pub use config::{ConnectionConfig, WatchSchedule};
pub use connection::{LedgerConnection, ResourceObserver};
pub use driver::{Driver, RequestVerification};
pub use error::{StatusCode, StubError, TransactionException};
pub use ledger::LedgerClient;
pub use properties::PropertyStore;
pub use protocol::{Request, RequestType, Response, SubType, TransactionParams};
pub use rpc::RpcLedgerClient;
pub use structs::{
    Block, CanonicalTransaction, Path, TransactionContext, TransactionRequest, TransactionResponse,
};
