//! Per-store reader/writer locks
//!
//! Ingests take the write side around persistence; queries take the read
//! side while loading, so a load never observes a store mid-swap.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lock registry keyed by store name
#[derive(Debug, Default)]
pub struct StoreLocks {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl StoreLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock guarding `store`, created on first use
    pub fn lock_for(&self, store: &str) -> Arc<RwLock<()>> {
        self.locks.entry(store.to_string()).or_default().clone()
    }

    /// Forget the lock for `store` once nobody holds or waits on it
    pub fn release(&self, store: &str) {
        self.locks
            .remove_if(store, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of stores with a live lock
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
