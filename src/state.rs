use crate::airdrop::{AirdropService, Participants};
use crate::backend::{BackendClient, TransferGateway};
use crate::cache::{self, InteractionCache, LookupCache, SelectionStore};
use crate::chat::ChatSurface;
use crate::config::Config;
use crate::ticker::TickerService;
use crate::watchlist::WatchlistService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub lookup: LookupCache,
    pub airdrops: AirdropService,
    pub selections: SelectionStore,
    pub ticker: TickerService,
    pub watchlist: WatchlistService,
    pub surface: Arc<dyn ChatSurface>,
    ready: AtomicBool,
}

impl AppState {
    /// Build every cache and service from `config`.
    ///
    /// Must be called inside a tokio runtime: airdrop timers are spawned on it.
    pub fn new(
        config: Config,
        backend: BackendClient,
        gateway: Arc<dyn TransferGateway>,
        surface: Arc<dyn ChatSurface>,
    ) -> Self {
        let lookup = cache::init_lookup_cache(&config);
        let selections = cache::init_selection_store(&config);
        let airdrops = AirdropService::new(
            InteractionCache::<Participants>::new(),
            gateway,
            surface.clone(),
        );

        Self {
            ticker: TickerService::new(backend.clone(), lookup.clone()),
            watchlist: WatchlistService::new(backend, lookup.clone()),
            config,
            lookup,
            airdrops,
            selections,
            surface,
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}
