//! Airdrops: timed windows in which users collect a share of a token reward
//!
//! Participants are tracked in the interaction cache under the airdrop
//! message. The window closes when its duration elapses or, if the airdrop
//! has a maximum number of entries, as soon as the last slot is taken.
//! Either way the entry settles exactly once through [`AirdropSettlement`].

pub mod buttons;
pub mod command;
pub mod settlement;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::backend::TransferGateway;
use crate::cache::interaction::{InteractionCache, Step, Update};
use crate::cache::keys::airdrop_key;
use crate::chat::{ChatSurface, Embed, MessageEdit, SurfaceError};

pub use buttons::{ConfirmButton, EnterButton};
pub use command::AirdropArgs;
pub use settlement::{join_participants, AirdropSettlement};

pub const AIRDROP_TITLE: &str = ":airplane: An airdrop appears";

/// Participant user ids in the order they entered
pub type Participants = Vec<String>;

/// A confirmed airdrop
#[derive(Debug, Clone, PartialEq)]
pub struct Airdrop {
    pub author_id: String,
    pub guild_id: String,
    pub channel_id: String,
    /// Message carrying the enter button
    pub message_id: String,
    pub amount: f64,
    pub amount_in_usd: f64,
    pub token: String,
    pub duration: Duration,
    /// `0` means unlimited: only the timer closes the airdrop
    pub max_entries: u32,
    pub full_command: String,
}

impl Airdrop {
    pub fn from_confirm(
        button: &ConfirmButton,
        guild_id: &str,
        channel_id: &str,
        message_id: &str,
        full_command: &str,
    ) -> Self {
        Self {
            author_id: button.author_id.clone(),
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            amount: button.amount,
            amount_in_usd: button.amount_in_usd,
            token: button.token.clone(),
            duration: Duration::from_secs(button.duration_secs),
            max_entries: button.max_entries,
            full_command: full_command.to_string(),
        }
    }

    fn enter_button(&self) -> EnterButton {
        EnterButton {
            author_id: self.author_id.clone(),
            duration_secs: self.duration.as_secs(),
            max_entries: self.max_entries,
        }
    }
}

/// What happened when a user pressed the enter button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Authors cannot enter their own airdrop
    OwnAirdrop,
    AlreadyEntered,
    /// `filled` is true when this entry took the last slot and closed the airdrop
    Entered { position: usize, filled: bool },
    /// The airdrop already settled
    Closed,
}

#[derive(Clone)]
pub struct AirdropService {
    entries: InteractionCache<Participants>,
    gateway: Arc<dyn TransferGateway>,
    surface: Arc<dyn ChatSurface>,
}

impl AirdropService {
    pub fn new(
        entries: InteractionCache<Participants>,
        gateway: Arc<dyn TransferGateway>,
        surface: Arc<dyn ChatSurface>,
    ) -> Self {
        Self {
            entries,
            gateway,
            surface,
        }
    }

    pub fn entries(&self) -> &InteractionCache<Participants> {
        &self.entries
    }

    /// Turn the confirmation message into a live airdrop and open its window.
    ///
    /// Nothing is tracked if the message cannot be edited.
    pub async fn start(&self, airdrop: Airdrop) -> Result<DateTime<Utc>, SurfaceError> {
        let ends_at = Utc::now()
            + chrono::Duration::from_std(airdrop.duration).unwrap_or(chrono::Duration::zero());

        let edit = MessageEdit {
            embeds: vec![Embed::new(AIRDROP_TITLE, announcement(&airdrop))
                .footer("Ends")
                .timestamp(ends_at)],
            components: Some(vec![json!({
                "type": 1,
                "components": [{
                    "type": 2,
                    "style": 1,
                    "label": "Enter airdrop",
                    "emoji": { "name": "\u{1F389}" },
                    "custom_id": airdrop.enter_button().custom_id(),
                }],
            })]),
        };
        self.surface
            .edit_message(&airdrop.channel_id, &airdrop.message_id, &edit)
            .await?;

        let key = airdrop_key(&airdrop.message_id);
        let ttl = airdrop.duration;
        info!(
            "Airdrop {} of {} {} open for {:?}, max entries {}",
            key, airdrop.amount, airdrop.token, ttl, airdrop.max_entries
        );

        let handler = Arc::new(AirdropSettlement::new(
            airdrop,
            self.gateway.clone(),
            self.surface.clone(),
        ));
        self.entries.set_with_handler(key, Vec::new(), ttl, handler);

        Ok(ends_at)
    }

    /// Record `user_id` as a participant of the airdrop on `message_id`.
    ///
    /// Appending, checking the quota and closing a full airdrop happen as
    /// one step, so no entry can land after the payout list was taken.
    pub fn enter(&self, message_id: &str, button: &EnterButton, user_id: &str) -> EntryOutcome {
        if button.author_id == user_id {
            return EntryOutcome::OwnAirdrop;
        }

        let key = airdrop_key(message_id);
        let max_entries = button.max_entries as usize;
        let update = self
            .entries
            .update(&key, |participants| {
                if participants.iter().any(|p| p == user_id) {
                    return (EntryOutcome::AlreadyEntered, Step::Keep);
                }

                participants.push(user_id.to_string());
                let position = participants.len();
                let filled = max_entries != 0 && position >= max_entries;
                let step = if filled { Step::Settle } else { Step::Keep };
                (EntryOutcome::Entered { position, filled }, step)
            });

        match update {
            Update::Missing => {
                debug!("{} tried to enter closed airdrop {}", user_id, key);
                EntryOutcome::Closed
            }
            Update::Kept(outcome) | Update::Settled(outcome) => outcome,
        }
    }

    /// Participants so far, `None` once the airdrop settled
    pub fn participants(&self, message_id: &str) -> Option<Participants> {
        self.entries.get(&airdrop_key(message_id))
    }
}

fn announcement(airdrop: &Airdrop) -> String {
    let audience = match airdrop.max_entries {
        0 => String::new(),
        1 => " for 1 person".to_string(),
        n => format!(" for {} people", n),
    };
    format!(
        "{} left an airdrop of **{} {}** (\u{2248} ${}){}.",
        mention(&airdrop.author_id),
        format_amount(airdrop.amount),
        airdrop.token,
        format_amount(airdrop.amount_in_usd),
        audience
    )
}

pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

/// Round to 4 decimals and drop trailing zeros
pub fn format_amount(amount: f64) -> String {
    let rounded = format!("{:.4}", amount);
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
