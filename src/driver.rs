use std::sync::Arc;

use alloy::{
    hex,
    json_abi::Function,
    primitives::Bytes,
};
use anyhow::{Context, Result, bail};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    abi::{self, ContractAbi},
    account::{Account, IdentityResolver, KeccakIdentityResolver},
    block::BlockTransactionParser,
    connection::LedgerConnection,
    constants::{PROPERTY_CHAIN_ID, PROXY_CONTRACT_NAME},
    error::{StatusCode, StubError, TransactionException},
    ledger::{BlockInfo, LedgerClient, TransactionProof, TxResponse},
    properties::PropertyStore,
    protocol::{
        Request, RequestType, Response, SubType, TransactionParams, decode_block_number,
        encode_block_number,
    },
    proxy::{self, ProxyCall, ProxyVariant, unwrap_proxy_output},
    revert::try_resolve_revert_message,
    structs::{
        Block, CanonicalTransaction, ResourceInfo, TransactionContext, TransactionRequest,
        TransactionResponse,
    },
};

pub type TransactionResult = Result<TransactionResponse, TransactionException>;

/// Outcome of re-deriving a serialized request's encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestVerification {
    /// Not a call or transaction request.
    NotTransaction,
    /// A call or transaction whose embedded encoding does not match its
    /// carried request.
    Untrusted,
    Trusted(TransactionRequest),
}

/// An envelope ready to dispatch, with the function it invokes.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub params: TransactionParams,
    pub function: Function,
}

/// Translates router requests into ledger contract invocations and back.
#[derive(Clone)]
pub struct Driver {
    identity_resolver: Arc<dyn IdentityResolver>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(Arc::new(KeccakIdentityResolver))
    }
}

impl Driver {
    pub fn new(identity_resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { identity_resolver }
    }

    pub async fn call<C: LedgerClient>(
        &self,
        context: &TransactionContext,
        request: &TransactionRequest,
        by_proxy: bool,
        connection: &LedgerConnection<C>,
    ) -> TransactionResult {
        let sub_type = if by_proxy {
            SubType::CallByProxy
        } else {
            SubType::CallNative
        };
        self.execute(context, request, sub_type, connection)
            .await
            .map_err(|e| {
                warn!("call {} on {} failed: {e}", request.method, context.path);
                e.into()
            })
    }

    pub async fn send_transaction<C: LedgerClient>(
        &self,
        context: &TransactionContext,
        request: &TransactionRequest,
        by_proxy: bool,
        connection: &LedgerConnection<C>,
    ) -> TransactionResult {
        let sub_type = if by_proxy {
            SubType::SendByProxy
        } else {
            SubType::SendNative
        };
        self.execute(context, request, sub_type, connection)
            .await
            .map_err(|e| {
                warn!("send {} on {} failed: {e}", request.method, context.path);
                e.into()
            })
    }

    /// [`Driver::call`] on a spawned task, delivering to `callback`.
    pub fn async_call<C, F>(
        &self,
        context: TransactionContext,
        request: TransactionRequest,
        by_proxy: bool,
        connection: Arc<LedgerConnection<C>>,
        callback: F,
    ) where
        C: LedgerClient,
        F: FnOnce(TransactionResult) + Send + 'static,
    {
        let driver = self.clone();
        tokio::spawn(async move {
            callback(driver.call(&context, &request, by_proxy, &*connection).await);
        });
    }

    /// [`Driver::send_transaction`] on a spawned task, delivering to `callback`.
    pub fn async_send_transaction<C, F>(
        &self,
        context: TransactionContext,
        request: TransactionRequest,
        by_proxy: bool,
        connection: Arc<LedgerConnection<C>>,
        callback: F,
    ) where
        C: LedgerClient,
        F: FnOnce(TransactionResult) + Send + 'static,
    {
        let driver = self.clone();
        tokio::spawn(async move {
            callback(
                driver
                    .send_transaction(&context, &request, by_proxy, &*connection)
                    .await,
            );
        });
    }

    async fn execute<C: LedgerClient>(
        &self,
        context: &TransactionContext,
        request: &TransactionRequest,
        sub_type: SubType,
        connection: &LedgerConnection<C>,
    ) -> Result<TransactionResponse, StubError> {
        let prepared = self.prepare(context, request, sub_type, connection.properties())?;
        let request_type = if sub_type.is_send() {
            RequestType::SendTransaction
        } else {
            RequestType::Call
        };
        debug!(
            "{sub_type} {} on {} via {}, method id {}",
            request.method,
            context.path,
            prepared.params.contract_address,
            prepared.params.contract_method_id
        );
        let response = connection
            .send(Request::with_json(request_type, &prepared.params)?)
            .await;
        decode_response(response, &prepared.function, sub_type)
    }

    /// Builds the envelope for `request` against the resource in `context`.
    pub fn prepare(
        &self,
        context: &TransactionContext,
        request: &TransactionRequest,
        sub_type: SubType,
        properties: &PropertyStore,
    ) -> Result<PreparedTransaction, StubError> {
        check_properties(properties)?;
        let name = &context.path.resource;
        let abi_json = properties.abi(name).ok_or_else(|| {
            StubError::new(
                StatusCode::ABINotExist,
                format!("resource ABI not exist: {name}"),
            )
        })?;
        let contract_abi = ContractAbi::parse(&abi_json)?;
        let function = contract_abi
            .resolve(&request.method, request.args.len())?
            .clone();

        let mut params = match sub_type {
            SubType::CallByProxy | SubType::SendByProxy => {
                let inner_args = abi::encode_args(&function, &request.args)?;
                let signature = function.signature();
                let path = context.path.to_string();
                let xa_transaction_id = request.xa_transaction_id();
                let variant = if sub_type.is_send() {
                    ProxyVariant::for_send(xa_transaction_id)
                } else {
                    ProxyVariant::for_call(xa_transaction_id)
                };
                let xa_transaction_id = xa_transaction_id.unwrap_or_default();
                let call = match variant {
                    ProxyVariant::Call => proxy::encode_call(name, &signature, &inner_args),
                    ProxyVariant::CallWithTxId => proxy::encode_call_with_tx_id(
                        xa_transaction_id,
                        &path,
                        &signature,
                        &inner_args,
                    ),
                    ProxyVariant::Send => proxy::encode_send(
                        &unique_id(request),
                        name,
                        &signature,
                        &inner_args,
                    ),
                    ProxyVariant::SendWithTxId => proxy::encode_send_with_tx_id(
                        &unique_id(request),
                        xa_transaction_id,
                        request.xa_transaction_seq(),
                        &path,
                        &signature,
                        &inner_args,
                    ),
                };
                let proxy_address = properties.proxy_address().unwrap_or_default();
                TransactionParams::new(
                    request.clone(),
                    proxy_address,
                    call.selector_hex(),
                    &call.calldata,
                    sub_type,
                )
            }
            SubType::CallNative | SubType::SendNative => {
                let address = properties.address(name).ok_or_else(|| {
                    StubError::new(
                        StatusCode::InvalidParameter,
                        format!("contract address not found, resource: {name}"),
                    )
                })?;
                let call = abi::encode_call(&function, &request.args)?;
                TransactionParams::new(
                    request.clone(),
                    address,
                    call.selector_hex(),
                    &call.calldata,
                    sub_type,
                )
            }
        };
        params.abi = Some(abi_json);
        if sub_type.is_send() {
            let account = context.account.as_ref().ok_or_else(|| {
                StubError::new(
                    StatusCode::InvalidParameter,
                    "an account is required to send a transaction",
                )
            })?;
            params.signing_material = Some(account.signing_material());
        }
        Ok(PreparedTransaction { params, function })
    }

    /// Checks that a serialized call or transaction request carries an
    /// encoding derived from its own method and arguments.
    pub fn decode_transaction_request(&self, request: &Request) -> RequestVerification {
        match RequestType::from_code(request.request_type) {
            Some(RequestType::Call | RequestType::SendTransaction) => {}
            _ => return RequestVerification::NotTransaction,
        }
        match verify_params(&request.data) {
            Ok(Some(transaction_request)) => RequestVerification::Trusted(transaction_request),
            Ok(None) => RequestVerification::Untrusted,
            Err(e) => {
                warn!("decode transaction request failed: {e:#}");
                RequestVerification::Untrusted
            }
        }
    }

    pub async fn get_block_number<C: LedgerClient>(
        &self,
        connection: &LedgerConnection<C>,
    ) -> Result<u64> {
        let response = connection
            .send(Request::new(RequestType::GetBlockNumber, Bytes::new()))
            .await;
        let data = success_data(response)?;
        let number = decode_block_number(&data)?;
        debug!("block number: {number}");
        Ok(number)
    }

    pub async fn get_block<C: LedgerClient>(
        &self,
        number: u64,
        only_header: bool,
        connection: &LedgerConnection<C>,
    ) -> Result<Block> {
        let response = connection
            .send(Request::new(
                RequestType::GetBlockByNumber,
                encode_block_number(number),
            ))
            .await;
        let data = success_data(response)?;
        let info: BlockInfo = serde_json::from_slice(&data).context("invalid block payload")?;
        let mut block = BlockTransactionParser::new(
            connection.properties(),
            self.identity_resolver.as_ref(),
        )
        .parse_block(&info, only_header)
        .with_context(|| format!("failed to parse block {number}"))?;
        block.raw_bytes = data;
        Ok(block)
    }

    /// Fetches a transaction by hash through its proof and rebuilds it.
    /// Fails when the proof places it outside `expected_block_number`.
    pub async fn get_transaction<C: LedgerClient>(
        &self,
        hash: &str,
        expected_block_number: u64,
        connection: &LedgerConnection<C>,
    ) -> Result<CanonicalTransaction> {
        let response = connection
            .send(Request::new(
                RequestType::GetTransactionProof,
                hash.as_bytes().to_vec(),
            ))
            .await;
        let data = success_data(response)?;
        let proof: TransactionProof =
            serde_json::from_slice(&data).context("invalid transaction proof")?;
        let info = &proof.transaction_info;
        if info.block_height != expected_block_number {
            return Err(StubError::new(
                StatusCode::TransactionProofVerifyFailed,
                format!(
                    "Transaction hash does not match the block number, \
                     expected {expected_block_number}, proof has {}",
                    info.block_height
                ),
            )
            .into());
        }
        BlockTransactionParser::new(connection.properties(), self.identity_resolver.as_ref())
            .parse_transaction(
                &info.transaction,
                info.block_height,
                info.transaction.payload.timestamp,
            )
            .with_context(|| format!("failed to parse transaction {hash}"))
    }

    pub fn account_sign(&self, account: &Account, message: &[u8]) -> Result<Bytes> {
        account.sign(message)
    }

    pub async fn get_resources<C: LedgerClient>(
        &self,
        connection: &LedgerConnection<C>,
    ) -> Vec<ResourceInfo> {
        connection.get_resources().await
    }
}

/// Fails with `InvalidParameter` unless the proxy address and chain id are set.
pub fn check_properties(properties: &PropertyStore) -> Result<(), StubError> {
    if !properties.contains(PROXY_CONTRACT_NAME) {
        return Err(StubError::new(
            StatusCode::InvalidParameter,
            format!("Proxy contract address not found, resource: {PROXY_CONTRACT_NAME}"),
        ));
    }
    if !properties.contains(PROPERTY_CHAIN_ID) {
        return Err(StubError::new(
            StatusCode::InvalidParameter,
            format!("Chain id not found, resource: {PROPERTY_CHAIN_ID}"),
        ));
    }
    Ok(())
}

fn success_data(response: Response) -> Result<Bytes> {
    if !response.is_success() {
        bail!(
            "request failed with code {}: {}",
            response.error_code,
            response.error_message
        );
    }
    Ok(response.data)
}

fn decode_response(
    response: Response,
    function: &Function,
    sub_type: SubType,
) -> Result<TransactionResponse, StubError> {
    if !response.is_success() {
        return Err(StubError::with_code(
            response.error_code,
            response.error_message,
        ));
    }
    let tx: TxResponse =
        serde_json::from_slice(&response.data).context("invalid ledger response")?;
    debug!("{sub_type} result, code: {}, message: {}", tx.code, tx.message);

    let transaction_response = if tx.is_success() {
        let result = if function.outputs.is_empty() {
            Vec::new()
        } else {
            let output = if sub_type.is_proxy() {
                unwrap_proxy_output(&tx.contract_result.result)?
            } else {
                tx.contract_result.result.clone()
            };
            abi::decode_result(function, &output)?
        };
        TransactionResponse::success(result)
    } else {
        let status = if sub_type.is_send() {
            StatusCode::SendTransactionNotSuccessStatus
        } else {
            StatusCode::CallNotSuccessStatus
        };
        TransactionResponse {
            error_code: status.code(),
            message: try_resolve_revert_message(
                tx.contract_result.code,
                &tx.contract_result.message,
            )
            .unwrap_or(tx.message),
            ..Default::default()
        }
    };
    Ok(TransactionResponse {
        hash: tx.tx_id,
        ..transaction_response
    })
}

/// `Some(request)` when the embedded encoding matches a fresh encoding of
/// the carried request, `None` when it does not.
fn verify_params(data: &[u8]) -> Result<Option<TransactionRequest>> {
    let params = TransactionParams::from_json(data)?;
    let request = &params.transaction_request;
    let abi_json = params.abi.as_deref().context("envelope carries no ABI")?;
    let contract_abi = ContractAbi::parse(abi_json)?;
    let function = contract_abi.resolve(&request.method, request.args.len())?;
    let calldata = params.calldata()?;
    let method_id = calldata.get(..4).map(hex::encode_prefixed);
    if method_id.as_deref() != Some(params.contract_method_id.as_str()) {
        warn!(
            "method id {} does not match the encoded input of {}",
            params.contract_method_id, request.method
        );
        return Ok(None);
    }

    let matches = if params.sub_type.is_proxy() {
        let family = if params.sub_type.is_send() {
            &ProxyVariant::SEND_PRIORITY
        } else {
            &ProxyVariant::CALL_PRIORITY
        };
        let Some(call) = ProxyCall::decode(&calldata, family)? else {
            warn!(
                "{} envelope does not carry a matching proxy call",
                params.sub_type
            );
            return Ok(None);
        };
        let expected = abi::encode_args(function, &request.args)?;
        call.inner_selector()? == function.selector() && call.inner_args() == expected.as_ref()
    } else {
        let expected = abi::encode_call(function, &request.args)?;
        calldata == expected.calldata.as_ref()
    };

    if !matches {
        warn!(
            "encoded input does not match request {}, input: {}",
            request.method,
            hex::encode_prefixed(&calldata)
        );
        return Ok(None);
    }
    Ok(Some(params.transaction_request))
}

fn unique_id(request: &TransactionRequest) -> String {
    request
        .unique_id()
        .map(str::to_string)
        .unwrap_or_else(generate_unique_id)
}

/// Random v4 uuid in its 32-character simple form.
fn generate_unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}
