//! Settlement contract for the interaction cache
//!
//! A settlement is the terminal action taken once an interaction window
//! closes, either because its TTL elapsed or because it was completed early.

use async_trait::async_trait;
use thiserror::Error;

/// Why an entry was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementCause {
    /// The entry's TTL elapsed
    Expired,
    /// The entry was settled before its TTL elapsed
    Early,
}

/// The key and value of an entry at the moment it was removed
#[derive(Debug, Clone)]
pub struct Settlement<V> {
    pub key: String,
    pub value: V,
    pub cause: SettlementCause,
}

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Could not update message: {0}")]
    Surface(String),

    #[error("Settlement failed: {0}")]
    Other(String),
}

/// Runs once per settled entry.
///
/// Errors are logged by the cache and go no further.
#[async_trait]
pub trait SettlementHandler<V>: Send + Sync + 'static {
    async fn settle(&self, settlement: Settlement<V>) -> Result<(), SettlementError>;
}
