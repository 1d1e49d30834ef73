//! Chat surface the bot renders interaction state to

pub mod discord;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use discord::DiscordSurface;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chat platform rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl SurfaceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SurfaceError::Http(e) => e.is_timeout() || e.is_connect(),
            SurfaceError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}

/// Replacement content for an existing message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageEdit {
    pub embeds: Vec<Embed>,
    /// `Some(vec![])` removes every button and menu from the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<serde_json::Value>>,
}

impl MessageEdit {
    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            components: None,
        }
    }

    pub fn clear_components(mut self) -> Self {
        self.components = Some(Vec::new());
        self
    }
}

/// Where rendered interaction state ends up
#[async_trait]
pub trait ChatSurface: Send + Sync + 'static {
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        edit: &MessageEdit,
    ) -> Result<(), SurfaceError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SurfaceError>;
}
