//! Cache key generation and management

use std::fmt;

/// Pool holding ticker searches, default tickers and comparisons
pub const TICKER_POOL: &str = "ticker";
/// Pool holding token and NFT watchlists
pub const WATCHLIST_POOL: &str = "watchlist";

/// A structured lookup key that can be converted to a string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// Key for coin search results
    TickerSearch { query: String },
    /// Key for a guild's default coin for a symbol
    TickerDefault { guild_id: String, query: String },
    /// Key for a token comparison over a number of days
    Compare {
        guild_id: String,
        base: String,
        target: String,
        days: u32,
    },
    /// Key for a user's token watchlist
    Watchlist { user_id: String },
    /// Key for a user's NFT watchlist
    WatchlistNft { user_id: String },
}

impl LookupKey {
    /// Create a new coin search key
    pub fn ticker_search(query: &str) -> Self {
        Self::TickerSearch {
            query: query.to_string(),
        }
    }

    /// Create a new default ticker key
    pub fn ticker_default(guild_id: &str, query: &str) -> Self {
        Self::TickerDefault {
            guild_id: guild_id.to_string(),
            query: query.to_string(),
        }
    }

    /// Create a new comparison key
    pub fn compare(guild_id: &str, base: &str, target: &str, days: u32) -> Self {
        Self::Compare {
            guild_id: guild_id.to_string(),
            base: base.to_string(),
            target: target.to_string(),
            days,
        }
    }

    /// Create a new token watchlist key
    pub fn watchlist(user_id: &str) -> Self {
        Self::Watchlist {
            user_id: user_id.to_string(),
        }
    }

    /// Create a new NFT watchlist key
    pub fn watchlist_nft(user_id: &str) -> Self {
        Self::WatchlistNft {
            user_id: user_id.to_string(),
        }
    }

    /// Pool this key lives in
    pub fn pool(&self) -> &'static str {
        match self {
            Self::TickerSearch { .. } | Self::TickerDefault { .. } | Self::Compare { .. } => {
                TICKER_POOL
            }
            Self::Watchlist { .. } | Self::WatchlistNft { .. } => WATCHLIST_POOL,
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TickerSearch { query } => write!(f, "ticker-search-{}", query),
            Self::TickerDefault { guild_id, query } => {
                write!(f, "ticker-default-{}-{}", guild_id, query)
            }
            Self::Compare { guild_id, base, target, days } => {
                write!(f, "compare-{}-{}-{}-{}", guild_id, base, target, days)
            }
            Self::Watchlist { user_id } => write!(f, "watchlist-{}", user_id),
            Self::WatchlistNft { user_id } => write!(f, "watchlist-nft-{}", user_id),
        }
    }
}

/// Prefix matching every day range of a `base`/`target` comparison.
///
/// Ends with the separator so `eth` never matches `ethw`.
pub fn compare_prefix(guild_id: &str, base: &str, target: &str) -> String {
    format!("compare-{}-{}-{}-", guild_id, base, target)
}

/// Interaction cache key for an airdrop message
pub fn airdrop_key(message_id: &str) -> String {
    format!("airdrop-{}", message_id)
}

/// Identifies the pending selection of one user in one channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub user_id: String,
    pub guild_id: String,
    pub channel_id: String,
}

impl SelectionKey {
    pub fn new(user_id: &str, guild_id: &str, channel_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
        }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.user_id, self.guild_id, self.channel_id)
    }
}
