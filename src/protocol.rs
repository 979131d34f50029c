//! Request/response envelopes exchanged between the translator and the
//! dispatcher, and the `TransactionParams` payload they carry.

use std::{collections::BTreeMap, fmt};

use alloy::{hex, primitives::Bytes};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    account::SigningMaterial,
    constants::CONTRACT_ARGS_EVM_PARAM,
    error::StatusCode,
    structs::TransactionRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RequestType {
    Call = 1000,
    SendTransaction = 1001,
    GetBlockNumber = 1002,
    GetBlockByNumber = 1003,
    GetTransactionProof = 1004,
    GetTransaction = 1005,
    CreateContract = 1006,
    UpgradeContract = 1007,
}

impl RequestType {
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        use RequestType::*;
        [
            Call,
            SendTransaction,
            GetBlockNumber,
            GetBlockByNumber,
            GetTransactionProof,
            GetTransaction,
            CreateContract,
            UpgradeContract,
        ]
        .into_iter()
        .find(|t| t.code() == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type")]
    pub request_type: i32,
    pub data: Bytes,
}

impl Request {
    pub fn new(request_type: RequestType, data: impl Into<Bytes>) -> Self {
        Self {
            request_type: request_type.code(),
            data: data.into(),
        }
    }

    pub fn with_json<T: Serialize>(request_type: RequestType, value: &T) -> Result<Self> {
        Ok(Self::new(request_type, serde_json::to_vec(value)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub error_code: i32,
    pub error_message: String,
    pub data: Bytes,
}

impl Response {
    pub fn success(data: impl Into<Bytes>) -> Self {
        Self {
            error_code: StatusCode::Success.code(),
            error_message: StatusCode::Success.message().to_string(),
            data: data.into(),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error_code: status.code(),
            error_message: message.into(),
            data: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == StatusCode::Success.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubType {
    #[serde(rename = "SEND_TX_BY_PROXY")]
    SendByProxy,
    #[serde(rename = "CALL_BY_PROXY")]
    CallByProxy,
    #[serde(rename = "SEND_TX")]
    SendNative,
    #[serde(rename = "CALL")]
    CallNative,
}

impl SubType {
    pub fn is_proxy(self) -> bool {
        matches!(self, SubType::SendByProxy | SubType::CallByProxy)
    }

    pub fn is_send(self) -> bool {
        matches!(self, SubType::SendByProxy | SubType::SendNative)
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubType::SendByProxy => "SEND_TX_BY_PROXY",
            SubType::CallByProxy => "CALL_BY_PROXY",
            SubType::SendNative => "SEND_TX",
            SubType::CallNative => "CALL",
        };
        f.write_str(name)
    }
}

/// Payload of `CALL` and `SEND_TRANSACTION` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub transaction_request: TransactionRequest,
    pub contract_address: String,
    /// `0x`-prefixed selector of the function invoked at `contract_address`.
    pub contract_method_id: String,
    pub contract_method_params: BTreeMap<String, Bytes>,
    pub sub_type: SubType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_material: Option<SigningMaterial>,
}

impl TransactionParams {
    pub fn new(
        transaction_request: TransactionRequest,
        contract_address: impl Into<String>,
        contract_method_id: impl Into<String>,
        calldata: &[u8],
        sub_type: SubType,
    ) -> Self {
        let mut contract_method_params = BTreeMap::new();
        contract_method_params.insert(CONTRACT_ARGS_EVM_PARAM.to_string(), to_hex_param(calldata));
        Self {
            transaction_request,
            contract_address: contract_address.into(),
            contract_method_id: contract_method_id.into(),
            contract_method_params,
            sub_type,
            abi: None,
            signing_material: None,
        }
    }

    /// The calldata carried under the EVM parameter key.
    pub fn calldata(&self) -> Result<Vec<u8>> {
        let param = self
            .contract_method_params
            .get(CONTRACT_ARGS_EVM_PARAM)
            .with_context(|| format!("missing contract method param {CONTRACT_ARGS_EVM_PARAM:?}"))?;
        from_hex_param(param)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("invalid transaction params")
    }
}

/// Calldata as the ledger expects it in a contract parameter: the UTF-8
/// bytes of its `0x`-prefixed hex form.
pub fn to_hex_param(calldata: &[u8]) -> Bytes {
    hex::encode_prefixed(calldata).into_bytes().into()
}

pub fn from_hex_param(param: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(param).context("contract parameter is not UTF-8")?;
    Ok(hex::decode(text.trim())?)
}

/// Minimal big-endian two's complement form of a block height.
pub fn encode_block_number(number: u64) -> Bytes {
    let be = number.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    let mut out = Vec::with_capacity(9);
    if be[first] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&be[first..]);
    out.into()
}

pub fn decode_block_number(data: &[u8]) -> Result<u64> {
    if data.is_empty() {
        bail!("empty block number");
    }
    if data[0] & 0x80 != 0 {
        bail!("negative block number 0x{}", hex::encode(data));
    }
    let significant = match data.iter().position(|b| *b != 0) {
        Some(first) => &data[first..],
        None => return Ok(0),
    };
    if significant.len() > 8 {
        bail!("block number 0x{} overflows u64", hex::encode(data));
    }
    let mut be = [0u8; 8];
    be[8 - significant.len()..].copy_from_slice(significant);
    Ok(u64::from_be_bytes(be))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_number_encoding() {
        assert_eq!(encode_block_number(0).as_ref(), &[0u8]);
        assert_eq!(encode_block_number(127).as_ref(), &[0x7f]);
        assert_eq!(encode_block_number(128).as_ref(), &[0x00, 0x80]);
        assert_eq!(encode_block_number(0x1234).as_ref(), &[0x12, 0x34]);
        for n in [0, 1, 255, 256, 65_535, u32::MAX as u64, u64::MAX] {
            assert_eq!(decode_block_number(&encode_block_number(n)).unwrap(), n);
        }
    }

    #[test]
    fn test_block_number_rejects_bad_input() {
        assert!(decode_block_number(&[]).is_err());
        assert!(decode_block_number(&[0xff]).is_err());
        assert!(decode_block_number(&[1; 9]).is_err());
    }

    #[test]
    fn test_hex_param() {
        let param = to_hex_param(&[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(param.as_ref(), b"0xa9059cbb");
        assert_eq!(from_hex_param(&param).unwrap(), vec![0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_params_json() {
        let request = TransactionRequest::new("get", vec![]);
        let params = TransactionParams::new(
            request,
            "0x01",
            "0x6d4ce63c",
            &[0x6d, 0x4c, 0xe6, 0x3c],
            SubType::CallNative,
        );
        let encoded = serde_json::to_vec(&params).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(json["subType"], "CALL");
        assert_eq!(json["contractMethodId"], "0x6d4ce63c");
        assert!(json.get("signingMaterial").is_none());

        let back = TransactionParams::from_json(&encoded).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.calldata().unwrap(), vec![0x6d, 0x4c, 0xe6, 0x3c]);
    }

    #[test]
    fn test_request_type_codes() {
        assert_eq!(RequestType::from_code(1000), Some(RequestType::Call));
        assert_eq!(RequestType::from_code(1007), Some(RequestType::UpgradeContract));
        assert_eq!(RequestType::from_code(999), None);
    }
}
