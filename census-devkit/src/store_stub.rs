/*!
In-memory key/value store with failure injection
*/

use async_trait::async_trait;
use census_agent::ceph::KeyValueStore;
use census_agent::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    puts: Arc<AtomicUsize>,
    unreachable: Arc<AtomicBool>,
    unreadable: Arc<AtomicBool>,
    read_only: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a backend error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Reads fail with a backend error, writes still land
    pub fn set_unreadable(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }

    /// Writes and deletes fail with a backend error
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Number of `put` calls attempted, successful or not
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn backend_error(key: &str, message: &str) -> StoreError {
        StoreError::Backend {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    fn check_reachable(&self, key: &str) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Self::backend_error(key, "connection timed out"));
        }
        Ok(())
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        self.check_reachable(key)?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Self::backend_error(key, "permission denied"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.check_reachable(key)?;
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(Self::backend_error(key, "input/output error"));
        }
        self.value(key).ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check_writable(key)?;
        self.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
