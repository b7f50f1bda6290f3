//! In-memory cache slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::CacheSlot;
use crate::error::Result;

/// Cache slot held in process memory; clones share storage.
#[derive(Clone, Default)]
pub struct MemoryCacheSlot {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCacheSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, for inspection
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl CacheSlot for MemoryCacheSlot {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
