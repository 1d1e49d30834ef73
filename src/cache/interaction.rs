//! Interaction-state cache with per-entry TTL and exactly-once settlement
//!
//! Each entry owns a tokio timer. Whoever removes an entry from the map
//! settles it: the timer when the TTL elapses, or a caller completing the
//! interaction early. Removal is atomic per key, so an entry is settled at
//! most once and later mutations observe a missing key. Handlers always run
//! on a spawned task, never inside the caller's future.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::settlement::{Settlement, SettlementCause, SettlementHandler};

/// What to do with an entry after an [`InteractionCache::update`] closure ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Keep,
    Settle,
}

/// Result of [`InteractionCache::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<R> {
    /// No live entry under the key
    Missing,
    /// The closure ran and the entry is still live
    Kept(R),
    /// The closure ran and the entry was handed to its settlement handler
    Settled(R),
}

struct Slot<V> {
    value: V,
    generation: u64,
    expires_at: Instant,
    handler: Option<Arc<dyn SettlementHandler<V>>>,
    timer: Option<AbortHandle>,
}

struct Inner<V> {
    entries: DashMap<String, Slot<V>>,
    default_handler: Option<Arc<dyn SettlementHandler<V>>>,
    generation: AtomicU64,
}

/// Short-lived, per-interaction mutable state.
///
/// Cloning is cheap and every clone shares the same entries. Timers are
/// spawned on the current tokio runtime, so `set` must be called from
/// inside one.
pub struct InteractionCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for InteractionCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Default for InteractionCache<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InteractionCache<V>
where
    V: Send + Sync + 'static,
{
    /// Create a cache without a default settlement handler
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a cache that settles every entry through `handler` unless the
    /// entry was stored with its own handler
    pub fn with_handler(handler: Arc<dyn SettlementHandler<V>>) -> Self {
        Self::build(Some(handler))
    }

    fn build(default_handler: Option<Arc<dyn SettlementHandler<V>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                default_handler,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Create or replace an entry and (re)start its timer.
    ///
    /// A replaced value is discarded without being settled.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.store(key.into(), value, ttl, None);
    }

    /// Like [`set`](Self::set), settling this entry through `handler`
    pub fn set_with_handler(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
        handler: Arc<dyn SettlementHandler<V>>,
    ) {
        self.store(key.into(), value, ttl, Some(handler));
    }

    fn store(
        &self,
        key: String,
        value: V,
        ttl: Duration,
        handler: Option<Arc<dyn SettlementHandler<V>>>,
    ) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = Slot {
            value,
            generation,
            expires_at: Instant::now() + ttl,
            handler,
            timer: None,
        };

        if let Some(previous) = self.inner.entries.insert(key.clone(), slot) {
            if let Some(timer) = previous.timer {
                timer.abort();
            }
            debug!("Replaced interaction entry: {}", key);
        }

        // Armed after the insert so a zero TTL cannot fire before the entry exists
        let weak = Arc::downgrade(&self.inner);
        let timer_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            expire(weak, timer_key, generation).await;
        });

        if let Some(mut slot) = self.inner.entries.get_mut(&key) {
            if slot.generation == generation {
                slot.timer = Some(handle.abort_handle());
            }
        }
        debug!("Stored interaction entry {} for {:?}", key, ttl);
    }

    /// Current value, without touching the TTL
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.inner.entries.get(key).map(|slot| slot.value.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Time left before the entry expires
    pub fn expires_in(&self, key: &str) -> Option<Duration> {
        self.inner
            .entries
            .get(key)
            .map(|slot| slot.expires_at.saturating_duration_since(Instant::now()))
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Apply `f` to the stored value in place. Returns `None` when the key is
    /// not live; the TTL is left as it was.
    pub fn mutate<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.inner
            .entries
            .get_mut(key)
            .map(|mut slot| f(&mut slot.value))
    }

    /// Apply `f` and, if it asks for it, settle the entry.
    ///
    /// `f` and the removal run under the same entry lock: no timer or other
    /// caller can observe the mutated value without also observing the
    /// removal. The handler then runs on its own task, so `Settled` is
    /// returned without waiting for it and dropping the caller cannot
    /// abandon a settlement.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut V) -> (R, Step)) -> Update<R> {
        let (result, removed) = match self.inner.entries.entry(key.to_string()) {
            Entry::Vacant(_) => return Update::Missing,
            Entry::Occupied(mut occupied) => {
                let (result, step) = f(&mut occupied.get_mut().value);
                if step == Step::Keep {
                    return Update::Kept(result);
                }
                (result, occupied.remove_entry())
            }
        };

        let (key, slot) = removed;
        self.settle_detached(key, slot);
        Update::Settled(result)
    }

    /// Settle an entry now with its current value.
    ///
    /// Returns `false` if the entry was already settled or never existed.
    /// Like [`update`](Self::update), the handler runs on its own task.
    pub fn trigger_early(&self, key: &str) -> bool {
        match self.inner.entries.remove(key) {
            Some((key, slot)) => {
                self.settle_detached(key, slot);
                true
            }
            None => false,
        }
    }

    fn settle_detached(&self, key: String, mut slot: Slot<V>) {
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.settle(key, slot, SettlementCause::Early).await;
        });
    }
}

async fn expire<V>(weak: Weak<Inner<V>>, key: String, generation: u64)
where
    V: Send + Sync + 'static,
{
    let Some(inner) = weak.upgrade() else {
        return;
    };

    // A newer `set` or an early settlement already took this entry
    let Some((key, slot)) = inner
        .entries
        .remove_if(&key, |_, slot| slot.generation == generation)
    else {
        return;
    };

    inner.settle(key, slot, SettlementCause::Expired).await;
}

impl<V> Inner<V>
where
    V: Send + Sync + 'static,
{
    async fn settle(&self, key: String, slot: Slot<V>, cause: SettlementCause) {
        let Slot { value, handler, .. } = slot;

        let Some(handler) = handler.or_else(|| self.default_handler.clone()) else {
            warn!("No settlement handler for {}, value dropped", key);
            return;
        };

        debug!("Settling {} ({:?})", key, cause);
        let settlement = Settlement {
            key: key.clone(),
            value,
            cause,
        };
        if let Err(e) = handler.settle(settlement).await {
            error!("Settlement for {} failed: {}", key, e);
        }
    }
}

impl<V> fmt::Debug for InteractionCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionCache")
            .field("entries", &self.inner.entries.len())
            .field("has_default_handler", &self.inner.default_handler.is_some())
            .finish()
    }
}
