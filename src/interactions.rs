//! Routing of button presses and menu selections into the bot's flows
//!
//! The dispatcher that owns the gateway connection hands each interaction
//! to [`handle_button`] or [`handle_select`] and sends back the reply.

use crate::airdrop::buttons::{CANCEL_ID, CONFIRM_PREFIX, ENTER_PREFIX};
use crate::airdrop::{Airdrop, AirdropArgs, ConfirmButton, EnterButton, EntryOutcome};
use crate::backend::models::Coin;
use crate::cache::{PendingChoice, SelectionKey};
use crate::chat::{Embed, MessageEdit, SurfaceError};
use crate::state::AppState;
use crate::ticker::{TickerError, TickerResolution};
use crate::validation::ValidationError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Custom id of the button that abandons a pending selection
pub const EXIT_ID: &str = "exit";

const TICKER_COMMAND: &str = "ticker";

#[derive(Error, Debug)]
pub enum InteractionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Ticker(#[from] TickerError),
}

/// A button pressed on one of the bot's messages
#[derive(Debug, Clone)]
pub struct ButtonPress {
    pub custom_id: String,
    pub user_id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    /// Text of the command that produced the message
    pub full_command: String,
}

impl ButtonPress {
    fn selection_key(&self) -> SelectionKey {
        SelectionKey::new(&self.user_id, &self.guild_id, &self.channel_id)
    }
}

/// What the dispatcher should answer with
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonReply {
    /// Acknowledge without sending anything
    Deferred,
    /// Reply visible only to the user who pressed
    Ephemeral(Embed),
}

pub async fn handle_button(state: &AppState, press: &ButtonPress) -> Result<ButtonReply, InteractionError> {
    let custom_id = press.custom_id.as_str();

    if custom_id == CANCEL_ID {
        cancel_airdrop(state, press).await;
        return Ok(ButtonReply::Deferred);
    }
    if custom_id == EXIT_ID {
        exit_selection(state, press).await;
        return Ok(ButtonReply::Deferred);
    }
    if custom_id.starts_with(CONFIRM_PREFIX) {
        return confirm_airdrop(state, press).await;
    }
    if custom_id.starts_with(ENTER_PREFIX) {
        return enter_airdrop(state, press);
    }

    debug!("Ignoring button {}", custom_id);
    Ok(ButtonReply::Deferred)
}

async fn cancel_airdrop(state: &AppState, press: &ButtonPress) {
    if let Err(e) = state
        .surface
        .delete_message(&press.channel_id, &press.message_id)
        .await
    {
        warn!("Could not delete cancelled airdrop {}: {}", press.message_id, e);
    }
}

async fn exit_selection(state: &AppState, press: &ButtonPress) {
    if state.selections.remove(&press.selection_key()).await.is_none() {
        return;
    }
    if let Err(e) = state
        .surface
        .delete_message(&press.channel_id, &press.message_id)
        .await
    {
        warn!("Could not delete exited selection {}: {}", press.message_id, e);
    }
}

async fn confirm_airdrop(state: &AppState, press: &ButtonPress) -> Result<ButtonReply, InteractionError> {
    let button = ConfirmButton::parse(&press.custom_id)?;

    // Only the author can confirm; anyone else's press is silently acknowledged
    if button.author_id != press.user_id {
        return Ok(ButtonReply::Deferred);
    }

    let airdrop = Airdrop::from_confirm(
        &button,
        &press.guild_id,
        &press.channel_id,
        &press.message_id,
        &press.full_command,
    );
    let ends_at = state.airdrops.start(airdrop).await?;
    info!("Airdrop on {} confirmed, ends at {}", press.message_id, ends_at);
    Ok(ButtonReply::Deferred)
}

fn enter_airdrop(state: &AppState, press: &ButtonPress) -> Result<ButtonReply, InteractionError> {
    let button = EnterButton::parse(&press.custom_id)?;
    let outcome = state
        .airdrops
        .enter(&press.message_id, &button, &press.user_id);

    let embed = match outcome {
        EntryOutcome::OwnAirdrop => Embed::new(
            ":no_entry_sign: Could not enter airdrop",
            "You cannot enter your own airdrops.",
        ),
        EntryOutcome::AlreadyEntered => Embed::new(
            ":no_entry_sign: Could not enter airdrop",
            "You are already waiting for this airdrop.",
        ),
        EntryOutcome::Entered { .. } => Embed::new(
            ":white_check_mark: Entered airdrop",
            format!("You will receive your reward in {}s.", button.duration_secs),
        )
        .footer("You will only receive this notification once"),
        EntryOutcome::Closed => Embed::new(
            ":no_entry_sign: Could not enter airdrop",
            "This airdrop has already ended.",
        ),
    };
    Ok(ButtonReply::Ephemeral(embed))
}

/// Confirmation message for `airdrop <amount> <token> [in <duration>] [for <entries>]`.
///
/// `amount_in_usd` is the value of the whole reward at the current price.
pub fn airdrop_command(
    state: &AppState,
    author_id: &str,
    args: &[&str],
    amount_in_usd: f64,
) -> Result<MessageEdit, InteractionError> {
    let args = AirdropArgs::parse(author_id, args, state.config.airdrop_default_duration)?;
    debug!("Airdrop of {} {} requested by {}", args.amount, args.token, author_id);
    Ok(args.confirmation(amount_in_usd))
}

/// Result of a `ticker` command
#[derive(Debug, Clone, PartialEq)]
pub enum TickerReply {
    Unsupported,
    Coin(Coin),
    /// A select menu of these coins should be shown; the choice is parked
    Choose(Vec<Coin>),
}

pub async fn ticker_command(
    state: &AppState,
    user_id: &str,
    guild_id: &str,
    channel_id: &str,
    query: &str,
) -> Result<TickerReply, InteractionError> {
    let reply = match state.ticker.resolve(guild_id, query).await? {
        TickerResolution::Unsupported => TickerReply::Unsupported,
        TickerResolution::Resolved(coin) => TickerReply::Coin(coin),
        TickerResolution::Ambiguous(coins) => {
            let key = SelectionKey::new(user_id, guild_id, channel_id);
            let choice = PendingChoice::new(TICKER_COMMAND, json!({ "query": query }));
            state.selections.update(&key, choice).await;
            TickerReply::Choose(coins)
        }
    };
    Ok(reply)
}

/// An option picked from one of the bot's select menus
#[derive(Debug, Clone)]
pub struct MenuSelection {
    pub user_id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectReply {
    /// Nothing was pending for this user, or it already expired
    Expired,
    DefaultSet { query: String, coin_id: String },
}

pub async fn handle_select(state: &AppState, selection: &MenuSelection) -> Result<SelectReply, InteractionError> {
    let key = SelectionKey::new(&selection.user_id, &selection.guild_id, &selection.channel_id);
    let Some(choice) = state.selections.get(&key).await else {
        return Ok(SelectReply::Expired);
    };

    if choice.command != TICKER_COMMAND {
        warn!("No selection handler for command {}", choice.command);
        return Ok(SelectReply::Expired);
    }

    let query = choice
        .payload
        .get("query")
        .and_then(|q| q.as_str())
        .ok_or_else(|| ValidationError::MissingParameter("query".to_string()))?;
    let coin_id = selection
        .values
        .first()
        .ok_or_else(|| ValidationError::MissingParameter("coin".to_string()))?;

    state
        .ticker
        .set_default(&selection.guild_id, query, coin_id)
        .await?;
    state.selections.remove(&key).await;

    Ok(SelectReply::DefaultSet {
        query: query.to_string(),
        coin_id: coin_id.clone(),
    })
}
