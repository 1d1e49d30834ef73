//! Read-through cache for backend lookups
//!
//! Entries live in named pools, each a Moka cache with its own TTL. A miss
//! runs the caller's fetch once per key: concurrent callers for the same key
//! wait on that single fetch. Only `ok` responses are stored.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::keys::LookupKey;
use crate::backend::{ApiResponse, BackendError};

type Stored = Arc<dyn Any + Send + Sync>;

/// TTL and size bound shared by every key of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPolicy {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl PoolPolicy {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self { ttl, max_capacity }
    }
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error(transparent)]
    Backend(Arc<BackendError>),

    #[error("Cached value for {pool}:{key} has a different type")]
    TypeMismatch { pool: String, key: String },
}

/// Entry counts of one pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub name: String,
    pub entries: u64,
    pub ttl_secs: u64,
}

// Outcomes of a fetch that must not be stored
enum Miss<T> {
    Rejected(ApiResponse<T>),
    Failed(Arc<BackendError>),
}

#[derive(Clone)]
struct Pool {
    cache: Cache<String, Stored>,
    policy: PoolPolicy,
}

impl Pool {
    fn new(name: &str, policy: PoolPolicy) -> Self {
        let cache = Cache::builder()
            .name(name)
            .max_capacity(policy.max_capacity)
            .time_to_live(policy.ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, policy }
    }
}

/// Manages the lookup pools shared by every command handler
#[derive(Clone)]
pub struct LookupCache {
    pools: Arc<DashMap<String, Pool>>,
    default_policy: PoolPolicy,
}

impl LookupCache {
    /// Create a lookup cache whose pools default to `default_policy`
    pub fn new(default_policy: PoolPolicy) -> Self {
        Self {
            pools: Arc::new(DashMap::new()),
            default_policy,
        }
    }

    /// Configure a pool with its own policy
    pub fn with_pool(self, name: &str, policy: PoolPolicy) -> Self {
        self.pools.insert(name.to_string(), Pool::new(name, policy));
        info!("Configured lookup pool {} with TTL {:?}", name, policy.ttl);
        self
    }

    fn pool(&self, name: &str) -> Cache<String, Stored> {
        self.pools
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating lookup pool {} with default policy", name);
                Pool::new(name, self.default_policy)
            })
            .cache
            .clone()
    }

    fn existing(&self, name: &str) -> Option<Cache<String, Stored>> {
        self.pools.get(name).map(|pool| pool.cache.clone())
    }

    /// Return the live entry for `pool`/`key`, or run `call` and store its
    /// result if it is `ok`.
    ///
    /// A `not ok` response is handed back uncached; an `Err` from `call`
    /// becomes [`LookupError::Backend`] and is not cached either.
    pub async fn get<T, F, Fut>(
        &self,
        pool: &str,
        key: &str,
        call: F,
    ) -> Result<ApiResponse<T>, LookupError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, BackendError>>,
    {
        let cache = self.pool(pool);
        let init = async move {
            match call().await {
                Ok(response) if response.ok => Ok(Arc::new(response) as Stored),
                Ok(response) => Err(Miss::Rejected(response)),
                Err(e) => Err(Miss::Failed(Arc::new(e))),
            }
        };

        let entry = match cache.entry(key.to_string()).or_try_insert_with(init).await {
            Ok(entry) => entry,
            Err(miss) => {
                return match miss.as_ref() {
                    Miss::Rejected(response) => {
                        debug!("Lookup {}:{} was rejected, not cached", pool, key);
                        Ok(response.clone())
                    }
                    Miss::Failed(e) => {
                        warn!("Lookup {}:{} failed: {}", pool, key, e);
                        Err(LookupError::Backend(e.clone()))
                    }
                };
            }
        };

        if entry.is_fresh() {
            debug!("Cache miss for key: {}:{}", pool, key);
        } else {
            debug!("Cache hit for key: {}:{}", pool, key);
        }

        match entry.into_value().downcast::<ApiResponse<T>>() {
            Ok(response) => Ok(response.as_ref().clone()),
            Err(_) => {
                warn!("Dropping {}:{}, cached under another type", pool, key);
                cache.invalidate(key).await;
                Err(LookupError::TypeMismatch {
                    pool: pool.to_string(),
                    key: key.to_string(),
                })
            }
        }
    }

    /// [`get`](Self::get) with the pool and key taken from a [`LookupKey`]
    pub async fn get_keyed<T, F, Fut>(
        &self,
        key: &LookupKey,
        call: F,
    ) -> Result<ApiResponse<T>, LookupError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, BackendError>>,
    {
        self.get(key.pool(), &key.to_string(), call).await
    }

    /// Invalidate one entry regardless of its remaining TTL
    pub async fn find_and_remove(&self, pool: &str, key: &str) {
        let Some(cache) = self.existing(pool) else {
            return;
        };
        cache.invalidate(key).await;
        debug!("Invalidated lookup entry: {}:{}", pool, key);
    }

    pub async fn remove_keyed(&self, key: &LookupKey) {
        self.find_and_remove(key.pool(), &key.to_string()).await;
    }

    /// Invalidate every entry of `pool` whose key starts with `prefix`
    pub fn find_and_remove_prefix(&self, pool: &str, prefix: &str) {
        let Some(cache) = self.existing(pool) else {
            return;
        };

        let prefix_owned = prefix.to_string();
        match cache.invalidate_entries_if(move |key, _| key.starts_with(&prefix_owned)) {
            Ok(_) => debug!("Invalidated lookup entries: {}:{}*", pool, prefix),
            Err(e) => warn!("Could not invalidate {}:{}*: {}", pool, prefix, e),
        }
    }

    /// Entry counts per pool, sorted by pool name
    pub async fn stats(&self) -> Vec<PoolStats> {
        let pools: Vec<(String, Pool)> = self
            .pools
            .iter()
            .map(|pool| (pool.key().clone(), pool.value().clone()))
            .collect();

        let mut stats = Vec::with_capacity(pools.len());
        for (name, pool) in pools {
            pool.cache.run_pending_tasks().await;
            stats.push(PoolStats {
                name,
                entries: pool.cache.entry_count(),
                ttl_secs: pool.policy.ttl.as_secs(),
            });
        }
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}
