//! In-memory configuration store.
//!
//! Implements [`ConfigPort`] over a map of `postcard` blobs keyed by a
//! string id.  Values are range-checked before they are persisted and
//! re-clamped when they are loaded.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::ClimateConfig;
use crate::error::ConfigError;

/// Upper bound for one stored blob.
const MAX_BLOB_SIZE: usize = 4000;

#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under `key`, bypassing validation.
    pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        self.store.borrow_mut().insert(key.to_owned(), bytes);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.borrow().contains_key(key)
    }
}

impl ConfigPort for MemoryConfigStore {
    fn load(&self, key: &str) -> Result<ClimateConfig, ConfigError> {
        let store = self.store.borrow();
        let bytes = store.get(key).ok_or(ConfigError::NotFound)?;
        let cfg: ClimateConfig = postcard::from_bytes(bytes).map_err(|_| {
            warn!("MemoryConfigStore: blob under '{key}' failed to decode");
            ConfigError::Corrupted
        })?;
        Ok(cfg.sanitized())
    }

    fn save(&self, key: &str, config: &ClimateConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::Corrupted)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::ValidationFailed("config blob too large"));
        }
        info!("MemoryConfigStore: saved '{key}' ({} bytes)", bytes.len());
        self.put_raw(key, bytes);
        Ok(())
    }
}
