pub mod interaction;
pub mod keys;
pub mod lookup;
pub mod selection;
pub mod settlement;

use crate::config::Config;
use keys::{TICKER_POOL, WATCHLIST_POOL};
use lookup::PoolPolicy;

pub use interaction::{InteractionCache, Step, Update};
pub use keys::{LookupKey, SelectionKey};
pub use lookup::{LookupCache, LookupError};
pub use selection::{PendingChoice, SelectionStore};
pub use settlement::{Settlement, SettlementCause, SettlementError, SettlementHandler};

pub fn init_lookup_cache(config: &Config) -> LookupCache {
    let capacity = config.lookup_cache_max_capacity;
    LookupCache::new(PoolPolicy::new(config.lookup_cache_ttl, capacity))
        .with_pool(TICKER_POOL, PoolPolicy::new(config.ticker_cache_ttl, capacity))
        .with_pool(WATCHLIST_POOL, PoolPolicy::new(config.watchlist_cache_ttl, capacity))
}

pub fn init_selection_store(config: &Config) -> SelectionStore {
    SelectionStore::new(config.lookup_cache_max_capacity, config.selection_ttl)
}
