//! Pending multi-step selections
//!
//! When a command answers with a select menu, the choice it is waiting for
//! is parked here under the user/guild/channel that asked. Idle choices
//! expire on their own.

use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use tracing::debug;

use super::keys::SelectionKey;

/// A selection a user has been offered but not made yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChoice {
    /// Command that will handle the selection
    pub command: String,
    /// Command-specific state, e.g. the symbol being resolved
    pub payload: Value,
}

impl PendingChoice {
    pub fn new(command: &str, payload: Value) -> Self {
        Self {
            command: command.to_string(),
            payload,
        }
    }
}

#[derive(Clone)]
pub struct SelectionStore {
    cache: Cache<String, PendingChoice>,
}

impl SelectionStore {
    /// Create a store dropping choices idle for longer than `idle_ttl`
    pub fn new(capacity: u64, idle_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .name("selection")
            .max_capacity(capacity)
            .time_to_idle(idle_ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &SelectionKey) -> Option<PendingChoice> {
        self.cache.get(&key.to_string()).await
    }

    /// Park or replace the pending choice for `key`
    pub async fn update(&self, key: &SelectionKey, choice: PendingChoice) {
        debug!("Pending {} selection for {}", choice.command, key);
        self.cache.insert(key.to_string(), choice).await;
    }

    /// Drop the pending choice, returning it if there was one
    pub async fn remove(&self, key: &SelectionKey) -> Option<PendingChoice> {
        let removed = self.cache.remove(&key.to_string()).await;
        if removed.is_some() {
            debug!("Removed pending selection for {}", key);
        }
        removed
    }

    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
