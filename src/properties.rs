use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use alloy::{hex, primitives::keccak256};
use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::{
    config::ConnectionConfig,
    constants::{
        EVM_CONTRACT_DIR, HUB_CONTRACT_NAME, PROPERTY_ABI_SUFFIX, PROPERTY_AUTH_TYPE,
        PROPERTY_CHAIN_ID, PROPERTY_CRYPTO_HASH, PROPERTY_ROOT_PATH, PROPERTY_STUB_TYPE,
        PROXY_CONTRACT_NAME,
    },
};

/// Connection properties: static settings, contract addresses keyed by
/// contract name and ABIs keyed by `<name>_ABI`. Entries are only added or
/// overwritten, never removed.
#[derive(Debug, Default)]
pub struct PropertyStore {
    entries: RwLock<HashMap<String, String>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        let store = Self::new();
        store.insert(PROPERTY_CHAIN_ID, &config.chain_id);
        store.insert(PROPERTY_AUTH_TYPE, &config.auth_type);
        store.insert(PROPERTY_STUB_TYPE, &config.stub_type);
        store.insert(PROPERTY_CRYPTO_HASH, &config.crypto_hash);
        if let Some(proxy) = &config.proxy_address {
            store.insert(PROXY_CONTRACT_NAME, proxy);
        }
        if let Some(hub) = &config.hub_address {
            store.insert(HUB_CONTRACT_NAME, hub);
        }
        if let Some(root) = &config.root_path {
            store.insert(PROPERTY_ROOT_PATH, root);
        }
        store
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn add_abi(&self, contract_name: &str, abi: impl Into<String>) {
        self.insert(format!("{contract_name}{PROPERTY_ABI_SUFFIX}"), abi);
    }

    pub fn abi(&self, contract_name: &str) -> Option<String> {
        self.get(&format!("{contract_name}{PROPERTY_ABI_SUFFIX}"))
    }

    /// Deployed address of a contract by name.
    pub fn address(&self, contract_name: &str) -> Option<String> {
        self.get(contract_name)
    }

    pub fn proxy_address(&self) -> Option<String> {
        self.address(PROXY_CONTRACT_NAME)
    }

    pub fn hub_address(&self) -> Option<String> {
        self.address(HUB_CONTRACT_NAME)
    }

    /// Registers every ABI found under `<root>/contracts/evm`, assigning each
    /// contract its name-derived address unless one is already configured.
    pub fn load_abi_dir(&self, root: impl AsRef<Path>) -> Result<usize> {
        let root = root.as_ref();
        let names = list_contract_names(root)?;
        for name in &names {
            let abi = read_contract_abi(root, name)?;
            self.add_abi(name, abi);
            if !self.contains(name) {
                self.insert(name.as_str(), contract_name_to_address(name));
            }
            debug!("loaded ABI of {name}");
        }
        info!("loaded {} contract ABIs from {}", names.len(), root.display());
        Ok(names.len())
    }
}

fn contract_dir(root: &Path, contract_name: &str) -> PathBuf {
    root.join(EVM_CONTRACT_DIR).join(contract_name)
}

/// Names of the non-hidden subdirectories of `<root>/contracts/evm`.
pub fn list_contract_names(root: &Path) -> Result<Vec<String>> {
    let dir = root.join(EVM_CONTRACT_DIR);
    let mut names = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("cannot list {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

pub fn read_contract_abi(root: &Path, contract_name: &str) -> Result<String> {
    let file = contract_dir(root, contract_name).join(format!("{contract_name}.abi"));
    if !file.exists() {
        bail!("{} not exists", file.display());
    }
    fs::read_to_string(&file).with_context(|| format!("cannot read {}", file.display()))
}

/// Address a contract receives when deployed under `contract_name`:
/// the last 20 bytes of keccak256 over the name, hex without prefix.
pub fn contract_name_to_address(contract_name: &str) -> String {
    hex::encode(&keccak256(contract_name.as_bytes())[12..])
}
