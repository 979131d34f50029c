//! Encoding and decoding of the four proxy-contract call shapes.
//!
//! Every proxied invocation is a call to the proxy contract whose arguments
//! carry routing metadata plus the inner contract call. The "without id"
//! variants carry the inner call as `selector ++ args`; the "with id"
//! variants carry the inner method signature and the bare argument bytes.

use alloy::{
    hex,
    primitives::{Bytes, Selector, U256, keccak256},
    sol_types::SolCall,
};
use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::{
    constants::PROXY_OUTPUT_HEADER_HEX_LEN,
    sol_types::WeCrossProxy::{
        constantCall_0Call, constantCall_1Call, sendTransaction_0Call, sendTransaction_1Call,
    },
    structs::Path,
};

/// Selector of a canonical signature string such as `transfer(address,uint256)`.
pub fn selector_of(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyVariant {
    Call,
    CallWithTxId,
    Send,
    SendWithTxId,
}

impl ProxyVariant {
    /// Decode-time match order for read-only calls.
    pub const CALL_PRIORITY: [ProxyVariant; 2] = [ProxyVariant::CallWithTxId, ProxyVariant::Call];
    /// Decode-time match order for transactions.
    pub const SEND_PRIORITY: [ProxyVariant; 2] = [ProxyVariant::SendWithTxId, ProxyVariant::Send];
    pub const ALL: [ProxyVariant; 4] = [
        ProxyVariant::CallWithTxId,
        ProxyVariant::Call,
        ProxyVariant::SendWithTxId,
        ProxyVariant::Send,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            ProxyVariant::Call => constantCall_0Call::SIGNATURE,
            ProxyVariant::CallWithTxId => constantCall_1Call::SIGNATURE,
            ProxyVariant::Send => sendTransaction_0Call::SIGNATURE,
            ProxyVariant::SendWithTxId => sendTransaction_1Call::SIGNATURE,
        }
    }

    pub fn selector(self) -> Selector {
        Selector::from(match self {
            ProxyVariant::Call => constantCall_0Call::SELECTOR,
            ProxyVariant::CallWithTxId => constantCall_1Call::SELECTOR,
            ProxyVariant::Send => sendTransaction_0Call::SELECTOR,
            ProxyVariant::SendWithTxId => sendTransaction_1Call::SELECTOR,
        })
    }

    pub fn is_send(self) -> bool {
        matches!(self, ProxyVariant::Send | ProxyVariant::SendWithTxId)
    }

    pub fn for_call(xa_transaction_id: Option<&str>) -> Self {
        if is_routed(xa_transaction_id) {
            ProxyVariant::CallWithTxId
        } else {
            ProxyVariant::Call
        }
    }

    pub fn for_send(xa_transaction_id: Option<&str>) -> Self {
        if is_routed(xa_transaction_id) {
            ProxyVariant::SendWithTxId
        } else {
            ProxyVariant::Send
        }
    }
}

fn is_routed(xa_transaction_id: Option<&str>) -> bool {
    matches!(xa_transaction_id, Some(id) if !id.is_empty() && id != "0")
}

/// A function invocation: the selector and the full calldata it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub selector: Selector,
    pub calldata: Bytes,
}

impl FunctionCall {
    fn from_calldata(calldata: Vec<u8>) -> Self {
        Self {
            selector: Selector::from_slice(&calldata[..4]),
            calldata: calldata.into(),
        }
    }

    /// Selector as `0x`-prefixed hex, the form carried in request envelopes.
    pub fn selector_hex(&self) -> String {
        hex::encode_prefixed(self.selector)
    }
}

/// Decoded arguments of one of the proxy's call/send functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyCall {
    Call {
        resource: String,
        inner: Bytes,
    },
    CallWithTxId {
        xa_transaction_id: String,
        path: String,
        method_signature: String,
        args: Bytes,
    },
    Send {
        unique_id: String,
        resource: String,
        inner: Bytes,
    },
    SendWithTxId {
        unique_id: String,
        xa_transaction_id: String,
        seq: u64,
        path: String,
        method_signature: String,
        args: Bytes,
    },
}

pub fn encode_call(resource: &str, inner_signature: &str, inner_args: &[u8]) -> FunctionCall {
    ProxyCall::Call {
        resource: resource.to_string(),
        inner: with_selector(inner_signature, inner_args),
    }
    .encode()
}

pub fn encode_call_with_tx_id(
    xa_transaction_id: &str,
    path: &str,
    inner_signature: &str,
    inner_args: &[u8],
) -> FunctionCall {
    ProxyCall::CallWithTxId {
        xa_transaction_id: xa_transaction_id.to_string(),
        path: path.to_string(),
        method_signature: inner_signature.to_string(),
        args: Bytes::copy_from_slice(inner_args),
    }
    .encode()
}

pub fn encode_send(
    unique_id: &str,
    resource: &str,
    inner_signature: &str,
    inner_args: &[u8],
) -> FunctionCall {
    ProxyCall::Send {
        unique_id: unique_id.to_string(),
        resource: resource.to_string(),
        inner: with_selector(inner_signature, inner_args),
    }
    .encode()
}

pub fn encode_send_with_tx_id(
    unique_id: &str,
    xa_transaction_id: &str,
    seq: u64,
    path: &str,
    inner_signature: &str,
    inner_args: &[u8],
) -> FunctionCall {
    ProxyCall::SendWithTxId {
        unique_id: unique_id.to_string(),
        xa_transaction_id: xa_transaction_id.to_string(),
        seq,
        path: path.to_string(),
        method_signature: inner_signature.to_string(),
        args: Bytes::copy_from_slice(inner_args),
    }
    .encode()
}

fn with_selector(signature: &str, args: &[u8]) -> Bytes {
    let mut inner = selector_of(signature).to_vec();
    inner.extend_from_slice(args);
    inner.into()
}

impl ProxyCall {
    pub fn variant(&self) -> ProxyVariant {
        match self {
            ProxyCall::Call { .. } => ProxyVariant::Call,
            ProxyCall::CallWithTxId { .. } => ProxyVariant::CallWithTxId,
            ProxyCall::Send { .. } => ProxyVariant::Send,
            ProxyCall::SendWithTxId { .. } => ProxyVariant::SendWithTxId,
        }
    }

    pub fn encode(&self) -> FunctionCall {
        let calldata = match self.clone() {
            ProxyCall::Call { resource, inner } => constantCall_0Call {
                name: resource,
                argsWithMethodId: inner,
            }
            .abi_encode(),
            ProxyCall::CallWithTxId {
                xa_transaction_id,
                path,
                method_signature,
                args,
            } => constantCall_1Call {
                transactionID: xa_transaction_id,
                path,
                realMethod: method_signature,
                args,
            }
            .abi_encode(),
            ProxyCall::Send {
                unique_id,
                resource,
                inner,
            } => sendTransaction_0Call {
                uid: unique_id,
                name: resource,
                argsWithMethodId: inner,
            }
            .abi_encode(),
            ProxyCall::SendWithTxId {
                unique_id,
                xa_transaction_id,
                seq,
                path,
                method_signature,
                args,
            } => sendTransaction_1Call {
                uid: unique_id,
                transactionID: xa_transaction_id,
                seq: U256::from(seq),
                path,
                realMethod: method_signature,
                args,
            }
            .abi_encode(),
        };
        FunctionCall::from_calldata(calldata)
    }

    /// Matches `input` against `candidates` in order and decodes with the
    /// first variant whose selector prefixes it. `Ok(None)` means the input
    /// is not a proxy call of any candidate variant.
    pub fn decode(input: &[u8], candidates: &[ProxyVariant]) -> Result<Option<ProxyCall>> {
        let Some(variant) = candidates
            .iter()
            .copied()
            .find(|variant| input.starts_with(variant.selector().as_slice()))
        else {
            return Ok(None);
        };
        debug!("proxy input matched {}", variant.signature());
        let call = match variant {
            ProxyVariant::Call => {
                let call = constantCall_0Call::abi_decode(input)
                    .context("malformed constantCall input")?;
                ProxyCall::Call {
                    resource: call.name,
                    inner: call.argsWithMethodId,
                }
            }
            ProxyVariant::CallWithTxId => {
                let call = constantCall_1Call::abi_decode(input)
                    .context("malformed constantCall with transaction id input")?;
                ProxyCall::CallWithTxId {
                    xa_transaction_id: call.transactionID,
                    path: call.path,
                    method_signature: call.realMethod,
                    args: call.args,
                }
            }
            ProxyVariant::Send => {
                let call = sendTransaction_0Call::abi_decode(input)
                    .context("malformed sendTransaction input")?;
                ProxyCall::Send {
                    unique_id: call.uid,
                    resource: call.name,
                    inner: call.argsWithMethodId,
                }
            }
            ProxyVariant::SendWithTxId => {
                let call = sendTransaction_1Call::abi_decode(input)
                    .context("malformed sendTransaction with transaction id input")?;
                ProxyCall::SendWithTxId {
                    unique_id: call.uid,
                    xa_transaction_id: call.transactionID,
                    seq: call.seq.try_into().context("transaction seq overflows u64")?,
                    path: call.path,
                    method_signature: call.realMethod,
                    args: call.args,
                }
            }
        };
        Ok(Some(call))
    }

    /// Resource name the inner call targets.
    pub fn resource(&self) -> Result<String> {
        match self {
            ProxyCall::Call { resource, .. } | ProxyCall::Send { resource, .. } => {
                Ok(resource.clone())
            }
            ProxyCall::CallWithTxId { path, .. } | ProxyCall::SendWithTxId { path, .. } => {
                Ok(path.parse::<Path>()?.resource)
            }
        }
    }

    pub fn inner_selector(&self) -> Result<Selector> {
        match self {
            ProxyCall::Call { inner, .. } | ProxyCall::Send { inner, .. } => {
                if inner.len() < 4 {
                    bail!("inner call is {} bytes, shorter than a selector", inner.len());
                }
                Ok(Selector::from_slice(&inner[..4]))
            }
            ProxyCall::CallWithTxId {
                method_signature, ..
            }
            | ProxyCall::SendWithTxId {
                method_signature, ..
            } => Ok(selector_of(method_signature)),
        }
    }

    /// Inner call arguments with any selector removed.
    pub fn inner_args(&self) -> &[u8] {
        match self {
            ProxyCall::Call { inner, .. } | ProxyCall::Send { inner, .. } => {
                inner.get(4..).unwrap_or_default()
            }
            ProxyCall::CallWithTxId { args, .. } | ProxyCall::SendWithTxId { args, .. } => args,
        }
    }

    pub fn xa_transaction_id(&self) -> Option<&str> {
        match self {
            ProxyCall::CallWithTxId {
                xa_transaction_id, ..
            }
            | ProxyCall::SendWithTxId {
                xa_transaction_id, ..
            } => Some(xa_transaction_id),
            _ => None,
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            ProxyCall::SendWithTxId { seq, .. } => *seq,
            _ => 0,
        }
    }
}

/// Strips the fixed-width head the proxy puts in front of the inner
/// function's return data and trims the tail padding using the length word.
pub fn unwrap_proxy_output(output: &[u8]) -> Result<Bytes> {
    let output_hex = hex::encode_prefixed(output);
    if output_hex.len() < PROXY_OUTPUT_HEADER_HEX_LEN {
        bail!(
            "proxy output too short: {} hex chars, need at least {}",
            output_hex.len(),
            PROXY_OUTPUT_HEADER_HEX_LEN
        );
    }
    let payload = hex::decode(&output_hex[PROXY_OUTPUT_HEADER_HEX_LEN..])?;
    let length: usize = U256::from_be_slice(&output[32..64])
        .try_into()
        .context("proxy output length word overflows usize")?;
    if length > payload.len() {
        bail!(
            "proxy output declares {} bytes but carries {}",
            length,
            payload.len()
        );
    }
    Ok(Bytes::copy_from_slice(&payload[..length]))
}
