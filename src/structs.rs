use std::{collections::BTreeMap, fmt, str::FromStr};

use alloy::primitives::Bytes;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    account::Account,
    constants::{NO_XA_TRANSACTION_ID, TRANSACTION_UNIQUE_ID, XA_TRANSACTION_ID, XA_TRANSACTION_SEQ},
    error::StatusCode,
};

/// Router-facing resource address, `zone.chain.resource`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    pub zone: String,
    pub chain: String,
    pub resource: String,
}

impl Path {
    pub fn new(
        zone: impl Into<String>,
        chain: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            zone: zone.into(),
            chain: chain.into(),
            resource: resource.into(),
        }
    }
}

impl FromStr for Path {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s.split('.').collect::<Vec<_>>();
        match parts.as_slice() {
            [zone, chain, resource] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Path::new(*zone, *chain, *resource))
            }
            _ => bail!("invalid path {s:?}, expected zone.chain.resource"),
        }
    }
}

impl TryFrom<String> for Path {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.zone, self.chain, self.resource)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub method: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl TransactionRequest {
    pub fn new(method: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            method: method.into(),
            args,
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// The cross-chain transaction id, `None` when absent, empty or "0".
    pub fn xa_transaction_id(&self) -> Option<&str> {
        match self.options.get(XA_TRANSACTION_ID).and_then(Value::as_str) {
            Some(id) if !id.is_empty() && id != NO_XA_TRANSACTION_ID => Some(id),
            _ => None,
        }
    }

    pub fn xa_transaction_seq(&self) -> u64 {
        match self.options.get(XA_TRANSACTION_SEQ) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.options.get(TRANSACTION_UNIQUE_ID).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub error_code: i32,
    pub message: String,
    pub result: Vec<String>,
    pub hash: String,
    pub block_number: u64,
    pub timestamp: u64,
}

impl TransactionResponse {
    pub fn success(result: Vec<String>) -> Self {
        Self {
            error_code: StatusCode::Success.code(),
            message: StatusCode::Success.message().to_string(),
            result,
            ..Default::default()
        }
    }
}

/// Per-request routing context supplied by the caller.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub path: Path,
    pub account: Option<Account>,
}

impl TransactionContext {
    pub fn new(path: Path, account: Option<Account>) -> Self {
        Self { path, account }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub name: String,
    pub stub_type: String,
    pub properties: BTreeMap<String, String>,
}

/// A transaction rebuilt from ledger data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    pub tx_id: String,
    pub account_identity: String,
    pub resource: Option<String>,
    pub method: Option<String>,
    pub args: Vec<String>,
    pub result: Vec<String>,
    pub error_code: i32,
    pub message: String,
    pub cross_chain_tx_id: String,
    pub cross_chain_seq: u64,
    pub by_proxy: bool,
    pub block_number: u64,
    pub timestamp: u64,
    pub tx_bytes: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: u64,
    pub hash: String,
    pub prev_hash: Option<String>,
    pub transaction_root: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: BlockHeader,
    pub transaction_hashes: Vec<String>,
    pub transactions_with_detail: Vec<CanonicalTransaction>,
    pub raw_bytes: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parse_and_display() {
        let path: Path = "payment.chain0.hello".parse().unwrap();
        assert_eq!(path.resource, "hello");
        assert_eq!(path.to_string(), "payment.chain0.hello");
        assert!("payment.hello".parse::<Path>().is_err());
        assert!("payment..hello".parse::<Path>().is_err());
    }

    #[test]
    fn test_xa_transaction_id_absent_empty_or_zero() {
        let request = TransactionRequest::new("get", vec![]);
        assert_eq!(request.xa_transaction_id(), None);
        let request = request.with_option(XA_TRANSACTION_ID, "");
        assert_eq!(request.xa_transaction_id(), None);
        let request = request.with_option(XA_TRANSACTION_ID, "0");
        assert_eq!(request.xa_transaction_id(), None);
        let request = request.with_option(XA_TRANSACTION_ID, "a1b2");
        assert_eq!(request.xa_transaction_id(), Some("a1b2"));
    }

    #[test]
    fn test_xa_transaction_seq_defaults_to_zero() {
        let request = TransactionRequest::new("get", vec![]);
        assert_eq!(request.xa_transaction_seq(), 0);
        let request = request.with_option(XA_TRANSACTION_SEQ, 7u64);
        assert_eq!(request.xa_transaction_seq(), 7);
    }
}
