use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric status codes shared by the dispatcher responses and the
/// transaction results handed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusCode {
    Success = 0,
    InvalidParameter = 2001,
    UnrecognizedRequestType = 2002,
    ABINotExist = 2003,
    MethodNotExist = 2004,
    HandleCallRequestFailed = 2005,
    HandleDeployContractFailed = 2006,
    HandleGetBlockNumberFailed = 2007,
    HandleGetBlockFailed = 2008,
    HandleGetTransactionFailed = 2009,
    CallNotSuccessStatus = 2010,
    SendTransactionNotSuccessStatus = 2011,
    TransactionProofVerifyFailed = 2012,
    UnclassifiedError = 2100,
}

impl StatusCode {
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        use StatusCode::*;
        [
            Success,
            InvalidParameter,
            UnrecognizedRequestType,
            ABINotExist,
            MethodNotExist,
            HandleCallRequestFailed,
            HandleDeployContractFailed,
            HandleGetBlockNumberFailed,
            HandleGetBlockFailed,
            HandleGetTransactionFailed,
            CallNotSuccessStatus,
            SendTransactionNotSuccessStatus,
            TransactionProofVerifyFailed,
            UnclassifiedError,
        ]
        .into_iter()
        .find(|status| status.code() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            StatusCode::Success => "Success",
            StatusCode::InvalidParameter => "Invalid parameter",
            StatusCode::UnrecognizedRequestType => "Unrecognized request type",
            StatusCode::ABINotExist => "ABI not exist",
            StatusCode::MethodNotExist => "Method not exist",
            StatusCode::HandleCallRequestFailed => "Handle call request failed",
            StatusCode::HandleDeployContractFailed => "Handle deploy contract failed",
            StatusCode::HandleGetBlockNumberFailed => "Handle get block number failed",
            StatusCode::HandleGetBlockFailed => "Handle get block failed",
            StatusCode::HandleGetTransactionFailed => "Handle get transaction failed",
            StatusCode::CallNotSuccessStatus => "Call not success status",
            StatusCode::SendTransactionNotSuccessStatus => "Send transaction not success status",
            StatusCode::TransactionProofVerifyFailed => "Transaction proof verify failed",
            StatusCode::UnclassifiedError => "Unclassified error",
        }
    }
}

/// Failure raised inside the translator; always converted to a
/// [`TransactionException`] before it reaches a caller.
#[derive(Debug, Clone, Error)]
#[error("{message} (code {code})")]
pub struct StubError {
    pub code: i32,
    pub message: String,
}

impl StubError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.code(),
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for StubError {
    fn from(e: anyhow::Error) -> Self {
        StubError::new(StatusCode::UnclassifiedError, format!("{e:#}"))
    }
}

/// Error half of every asynchronous transaction result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("transaction failed with code {error_code}: {message}")]
pub struct TransactionException {
    pub error_code: i32,
    pub message: String,
}

impl From<StubError> for TransactionException {
    fn from(e: StubError) -> Self {
        Self {
            error_code: e.code,
            message: e.message,
        }
    }
}
