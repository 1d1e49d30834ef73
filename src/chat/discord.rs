use crate::chat::{ChatSurface, MessageEdit, SurfaceError};
use crate::config::Config;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Edits messages through the Discord REST API
#[derive(Clone)]
pub struct DiscordSurface {
    http: reqwest::Client,
    api_url: String,
    token: String,
    max_retries: usize,
}

impl DiscordSurface {
    pub fn new(config: &Config) -> Result<Self, SurfaceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_secs))
            .build()?;

        info!("Initializing Discord surface with API: {}", config.discord_api_url);
        if config.discord_token.is_empty() {
            warn!("DISCORD_TOKEN is not set, message edits will be rejected");
        }

        Ok(Self::with_http(http, &config.discord_api_url, &config.discord_token))
    }

    pub fn with_http(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_retries: 3,
        }
    }

    fn message_url(&self, channel_id: &str, message_id: &str) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.api_url, channel_id, message_id
        )
    }

    async fn patch_message(
        &self,
        channel_id: &str,
        message_id: &str,
        edit: &MessageEdit,
    ) -> Result<(), SurfaceError> {
        let response = self
            .http
            .patch(self.message_url(channel_id, message_id))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(edit)
            .send()
            .await?;

        check(response).await
    }
}

async fn check(response: reqwest::Response) -> Result<(), SurfaceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let message = response.text().await.unwrap_or_default();
    Err(SurfaceError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ChatSurface for DiscordSurface {
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        edit: &MessageEdit,
    ) -> Result<(), SurfaceError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(250))
            .with_max_times(self.max_retries);

        (|| async { self.patch_message(channel_id, message_id, edit).await })
            .retry(backoff)
            .when(|e: &SurfaceError| e.is_transient())
            .notify(|e: &SurfaceError, after: Duration| {
                warn!(
                    "Editing message {} failed ({}), retrying in {:?}",
                    message_id, e, after
                );
            })
            .await?;

        debug!("Edited message {} in channel {}", message_id, channel_id);
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SurfaceError> {
        let response = self
            .http
            .delete(self.message_url(channel_id, message_id))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await?;
        check(response).await?;

        debug!("Deleted message {} in channel {}", message_id, channel_id);
        Ok(())
    }
}
