pub mod airdrop;
pub mod api;
pub mod backend;
pub mod cache;
pub mod chat;
pub mod config;
pub mod interactions;
pub mod state;
pub mod ticker;
pub mod validation;
pub mod watchlist;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::route::create_router;
pub use cache::{InteractionCache, LookupCache, LookupKey};
pub use interactions::{handle_button, handle_select, ButtonPress, ButtonReply};
pub use state::AppState;
