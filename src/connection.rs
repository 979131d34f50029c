use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, PoisonError, RwLock, Weak},
};

use alloy::{
    hex,
    primitives::Bytes,
    sol_types::{SolCall, SolValue},
};
use anyhow::{Context, Result, anyhow, bail};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    account::Account,
    config::WatchSchedule,
    constants::{CONTRACT_ARGS_EVM_PARAM, PROPERTY_AUTH_TYPE, PROPERTY_CHAIN_ID, PROPERTY_STUB_TYPE},
    error::StatusCode,
    ledger::{
        ContractManagePayload, EndorsementEntry, KeyValuePair, LedgerClient, TransactionProof,
    },
    properties::PropertyStore,
    protocol::{
        Request, RequestType, Response, TransactionParams, decode_block_number,
        encode_block_number, to_hex_param,
    },
    sol_types::WeCrossProxy::{getPathsCall, registerCNSCall},
    structs::ResourceInfo,
};

/// Receives the resource list whenever the on-chain registry changes.
pub trait ResourceObserver: Send + Sync {
    fn on_resources_change(&self, resources: Vec<ResourceInfo>);
}

/// Owns the ledger client and answers [`Request`]s with exactly one
/// [`Response`] each. Also runs the resource watcher once started.
pub struct LedgerConnection<C: LedgerClient> {
    inner: Arc<Inner<C>>,
    watcher: std::sync::Mutex<Option<JoinHandle<()>>>,
}

struct Inner<C> {
    client: C,
    properties: Arc<PropertyStore>,
    static_resources: Vec<ResourceInfo>,
    endorsers: Vec<Account>,
    observer: RwLock<Option<Arc<dyn ResourceObserver>>>,
    resources_cache: Mutex<Vec<ResourceInfo>>,
}

impl<C: LedgerClient> LedgerConnection<C> {
    pub fn new(client: C, properties: Arc<PropertyStore>) -> Self {
        Self::with_parts(client, properties, Vec::new(), Vec::new())
    }

    /// `static_resources` are always reported ahead of the on-chain list;
    /// `endorsers` sign contract deployment and upgrade requests.
    pub fn with_parts(
        client: C,
        properties: Arc<PropertyStore>,
        static_resources: Vec<ResourceInfo>,
        endorsers: Vec<Account>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                properties,
                static_resources,
                endorsers,
                observer: RwLock::new(None),
                resources_cache: Mutex::new(Vec::new()),
            }),
            watcher: std::sync::Mutex::new(None),
        }
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.inner.properties
    }

    pub fn client(&self) -> &C {
        &self.inner.client
    }

    pub async fn send(&self, request: Request) -> Response {
        self.inner.dispatch(request).await
    }

    /// Dispatches on a spawned task and hands the response to `callback`.
    pub fn async_send<F>(&self, request: Request, callback: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            callback(inner.dispatch(request).await);
        });
    }

    /// Resource paths registered on the proxy, newest first and without
    /// duplicates. `None` when they could not be fetched.
    pub async fn list_resources(&self) -> Option<Vec<String>> {
        self.inner.list_resources().await
    }

    pub async fn get_resources(&self) -> Vec<ResourceInfo> {
        self.inner.get_resources().await
    }

    pub fn set_event_handler(&self, observer: Arc<dyn ResourceObserver>) {
        *self
            .inner
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    pub async fn note_on_resources_change(&self) {
        self.inner.note_on_resources_change().await
    }

    /// Starts the periodic resource watcher, replacing any running one.
    pub fn start_resource_watcher(&self, schedule: WatchSchedule) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(watch_resources(weak, schedule));
        let previous = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        info!(
            "resource watcher started, first run in {:?} then every {:?}",
            schedule.initial_delay, schedule.period
        );
    }

    pub fn stop_resource_watcher(&self) {
        if let Some(handle) = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            info!("resource watcher stopped");
        }
    }

    /// Registers `path` under `address` in the proxy's name service. Failures
    /// are logged only.
    pub async fn register_path(&self, path: &str, address: &str) {
        if let Err(e) = self.inner.register_path(path, address).await {
            warn!("registerCNS failed, path: {path}, address: {address}: {e:#}");
        }
    }

    pub fn has_proxy_deployed(&self) -> bool {
        self.properties().proxy_address().is_some()
    }

    pub fn has_hub_deployed(&self) -> bool {
        self.properties().hub_address().is_some()
    }
}

impl<C: LedgerClient> Drop for LedgerConnection<C> {
    fn drop(&mut self) {
        self.stop_resource_watcher();
    }
}

async fn watch_resources<C: LedgerClient>(inner: Weak<Inner<C>>, schedule: WatchSchedule) {
    let mut ticker = time::interval_at(Instant::now() + schedule.initial_delay, schedule.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.note_on_resources_change().await;
    }
}

fn method_params(params: &BTreeMap<String, Bytes>) -> Vec<KeyValuePair> {
    params
        .iter()
        .map(|(key, value)| KeyValuePair::new(key.clone(), value.clone()))
        .collect()
}

impl<C: LedgerClient> Inner<C> {
    async fn dispatch(&self, request: Request) -> Response {
        let Some(request_type) = RequestType::from_code(request.request_type) else {
            warn!("unrecognized request type, type: {}", request.request_type);
            return Response::error(
                StatusCode::UnrecognizedRequestType,
                format!(
                    "{} ,type: {}",
                    StatusCode::UnrecognizedRequestType.message(),
                    request.request_type
                ),
            );
        };
        let data = &request.data;
        let (result, failure) = match request_type {
            RequestType::Call => (
                self.handle_call(data).await,
                StatusCode::HandleCallRequestFailed,
            ),
            RequestType::SendTransaction => (
                self.handle_send_transaction(data).await,
                StatusCode::HandleCallRequestFailed,
            ),
            RequestType::GetBlockNumber => (
                self.handle_get_block_number().await,
                StatusCode::HandleGetBlockNumberFailed,
            ),
            RequestType::GetBlockByNumber => (
                self.handle_get_block(data).await,
                StatusCode::HandleGetBlockFailed,
            ),
            RequestType::GetTransactionProof => (
                self.handle_get_transaction_proof(data).await,
                StatusCode::HandleGetTransactionFailed,
            ),
            RequestType::GetTransaction => (
                self.handle_get_transaction(data).await,
                StatusCode::HandleGetTransactionFailed,
            ),
            RequestType::CreateContract | RequestType::UpgradeContract => (
                self.handle_deploy_contract(data).await,
                StatusCode::HandleDeployContractFailed,
            ),
        };
        match result {
            Ok(data) => Response::success(data),
            Err(e) => {
                warn!("{request_type:?} request failed: {e:#}");
                Response::error(failure, format!("{e:#}"))
            }
        }
    }

    async fn handle_call(&self, data: &[u8]) -> Result<Vec<u8>> {
        let params = TransactionParams::from_json(data)?;
        let response = self
            .client
            .query_contract(
                &params.contract_address,
                &params.contract_method_id,
                method_params(&params.contract_method_params),
            )
            .await?;
        debug!(
            "call result, code: {}, message: {}",
            response.code, response.message
        );
        Ok(serde_json::to_vec(&response)?)
    }

    async fn handle_send_transaction(&self, data: &[u8]) -> Result<Vec<u8>> {
        let params = TransactionParams::from_json(data)?;
        let response = self
            .client
            .invoke_contract(
                &params.contract_address,
                &params.contract_method_id,
                method_params(&params.contract_method_params),
            )
            .await?;
        debug!(
            "send transaction result, code: {}, message: {}, tx: {}",
            response.code, response.message, response.tx_id
        );
        Ok(serde_json::to_vec(&response)?)
    }

    async fn handle_get_block_number(&self) -> Result<Vec<u8>> {
        let height = self.client.get_current_block_height().await?;
        debug!("current block height: {height}");
        Ok(encode_block_number(height).to_vec())
    }

    async fn handle_get_block(&self, data: &[u8]) -> Result<Vec<u8>> {
        let height = decode_block_number(data)?;
        let block = self.client.get_block_by_height(height).await?;
        debug!(
            "block {height} with {} transactions",
            block.block.txs.len()
        );
        Ok(serde_json::to_vec(&block)?)
    }

    async fn handle_get_transaction(&self, data: &[u8]) -> Result<Vec<u8>> {
        let tx_id = std::str::from_utf8(data).context("transaction hash is not UTF-8")?;
        let info = self.client.get_tx_by_tx_id(tx_id).await?;
        Ok(serde_json::to_vec(&info)?)
    }

    async fn handle_get_transaction_proof(&self, data: &[u8]) -> Result<Vec<u8>> {
        let tx_id = std::str::from_utf8(data).context("transaction hash is not UTF-8")?;
        let (transaction_info, merkle_path) = tokio::try_join!(
            self.client.get_tx_by_tx_id(tx_id),
            self.client.get_merkle_path_by_tx_id(tx_id)
        )?;
        let proof = TransactionProof {
            transaction_info,
            merkle_path,
        };
        Ok(serde_json::to_vec(&proof)?)
    }

    async fn handle_deploy_contract(&self, data: &[u8]) -> Result<Vec<u8>> {
        let payload: ContractManagePayload =
            serde_json::from_slice(data).context("invalid contract manage payload")?;
        let message = serde_json::to_vec(&payload)?;
        let endorsements = self
            .endorsers
            .iter()
            .map(|account| {
                Ok(EndorsementEntry {
                    member_info: account.member_info(),
                    signature: account.sign(&message)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let response = self
            .client
            .send_contract_manage_request(payload, endorsements)
            .await?;
        if !response.is_success() {
            return Err(anyhow!(response.contract_result.message));
        }
        Ok(serde_json::to_vec(&response)?)
    }

    async fn list_resources(&self) -> Option<Vec<String>> {
        match self.fetch_paths().await {
            Ok(paths) => {
                if paths.is_empty() {
                    debug!("no path registered on the proxy");
                }
                let mut seen = HashSet::new();
                Some(
                    paths
                        .into_iter()
                        .rev()
                        .filter(|path| seen.insert(path.clone()))
                        .collect(),
                )
            }
            Err(e) => {
                warn!("listPaths failed: {e:#}");
                None
            }
        }
    }

    async fn fetch_paths(&self) -> Result<Vec<String>> {
        let proxy = self
            .properties
            .proxy_address()
            .context("proxy contract address not configured")?;
        let calldata = getPathsCall {}.abi_encode();
        let response = self
            .client
            .query_contract(
                &proxy,
                &hex::encode_prefixed(getPathsCall::SELECTOR),
                vec![KeyValuePair::new(CONTRACT_ARGS_EVM_PARAM, to_hex_param(&calldata))],
            )
            .await?;
        if !response.is_success() {
            bail!("listPaths failed, status {}", response.code);
        }
        Ok(Vec::<String>::abi_decode(&response.contract_result.result)?)
    }

    async fn get_resources(&self) -> Vec<ResourceInfo> {
        let mut resources = self.static_resources.clone();
        if let Some(names) = self.list_resources().await {
            let stub_type = self.properties.get(PROPERTY_STUB_TYPE).unwrap_or_default();
            let mut properties = BTreeMap::new();
            for key in [PROPERTY_CHAIN_ID, PROPERTY_AUTH_TYPE] {
                properties.insert(key.to_string(), self.properties.get(key).unwrap_or_default());
            }
            resources.extend(names.into_iter().map(|name| ResourceInfo {
                name,
                stub_type: stub_type.clone(),
                properties: properties.clone(),
            }));
        }
        resources
    }

    async fn note_on_resources_change(&self) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            return;
        };
        let mut cache = self.resources_cache.lock().await;
        let resources = self.get_resources().await;
        if !resources.is_empty() && resources != *cache {
            debug!("resources notify, {} resources", resources.len());
            observer.on_resources_change(resources.clone());
            *cache = resources;
        }
    }

    async fn register_path(&self, path: &str, address: &str) -> Result<()> {
        let proxy = self
            .properties
            .proxy_address()
            .context("proxy contract address not configured")?;
        let calldata = registerCNSCall {
            path: path.to_string(),
            addr: address.to_string(),
        }
        .abi_encode();
        let response = self
            .client
            .invoke_contract(
                &proxy,
                &hex::encode_prefixed(registerCNSCall::SELECTOR),
                vec![KeyValuePair::new(CONTRACT_ARGS_EVM_PARAM, to_hex_param(&calldata))],
            )
            .await?;
        if !response.is_success() {
            bail!("code {}: {}", response.code, response.message);
        }
        Ok(())
    }
}
