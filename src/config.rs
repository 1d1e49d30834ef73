use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_server_host: String,
    pub discord_token: String,
    pub discord_api_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub lookup_cache_ttl: Duration,
    pub ticker_cache_ttl: Duration,
    pub watchlist_cache_ttl: Duration,
    pub lookup_cache_max_capacity: u64,
    pub selection_ttl: Duration,
    pub airdrop_default_duration: Duration,
    pub backend_timeout_secs: u64,
    pub backend_rate_limit: Option<u32>,
}

fn secs_var(name: &str, default: u64) -> Duration {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default))
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let api_server_host =
            env::var("API_SERVER_HOST").unwrap_or_else(|_| "http://localhost:8200".to_string());
        let discord_token = env::var("DISCORD_TOKEN").unwrap_or_default();
        let discord_api_url = env::var("DISCORD_API_URL")
            .unwrap_or_else(|_| "https://discord.com/api/v10".to_string());
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .unwrap_or(5001);
        let lookup_cache_ttl = secs_var("LOOKUP_CACHE_TTL", 60);
        let ticker_cache_ttl = secs_var("TICKER_CACHE_TTL", 60);
        let watchlist_cache_ttl = secs_var("WATCHLIST_CACHE_TTL", 30);
        let lookup_cache_max_capacity = env::var("LOOKUP_CACHE_MAX_CAPACITY")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);
        let selection_ttl = secs_var("SELECTION_TTL", 300);
        let airdrop_default_duration = secs_var("AIRDROP_DEFAULT_DURATION", 180);
        let backend_timeout_secs = env::var("BACKEND_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(30))
            .unwrap_or(30);
        let backend_rate_limit = env::var("BACKEND_RATE_LIMIT")
            .map(|v| v.parse().ok())
            .unwrap_or(None);

        Self {
            api_server_host,
            discord_token,
            discord_api_url,
            server_host,
            server_port,
            lookup_cache_ttl,
            ticker_cache_ttl,
            watchlist_cache_ttl,
            lookup_cache_max_capacity,
            selection_ttl,
            airdrop_default_duration,
            backend_timeout_secs,
            backend_rate_limit,
        }
    }
}

impl Default for Config {
    /// Every key at its default, without reading the environment
    fn default() -> Self {
        Self {
            api_server_host: "http://localhost:8200".to_string(),
            discord_token: String::new(),
            discord_api_url: "https://discord.com/api/v10".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 5001,
            lookup_cache_ttl: Duration::from_secs(60),
            ticker_cache_ttl: Duration::from_secs(60),
            watchlist_cache_ttl: Duration::from_secs(30),
            lookup_cache_max_capacity: 1000,
            selection_ttl: Duration::from_secs(300),
            airdrop_default_duration: Duration::from_secs(180),
            backend_timeout_secs: 30,
            backend_rate_limit: None,
        }
    }
}
