use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{format_amount, mention, Airdrop, AIRDROP_TITLE};
use crate::backend::{TransferGateway, TransferRequest};
use crate::cache::settlement::{Settlement, SettlementError, SettlementHandler};
use crate::chat::{ChatSurface, Embed, MessageEdit};

/// Pays out one airdrop and closes its message
pub struct AirdropSettlement {
    airdrop: Airdrop,
    gateway: Arc<dyn TransferGateway>,
    surface: Arc<dyn ChatSurface>,
}

impl AirdropSettlement {
    pub fn new(
        airdrop: Airdrop,
        gateway: Arc<dyn TransferGateway>,
        surface: Arc<dyn ChatSurface>,
    ) -> Self {
        Self {
            airdrop,
            gateway,
            surface,
        }
    }

    fn transfer_request(&self, participants: &[String]) -> TransferRequest {
        TransferRequest {
            sender: self.airdrop.author_id.clone(),
            recipients: participants.to_vec(),
            guild_id: self.airdrop.guild_id.clone(),
            channel_id: self.airdrop.channel_id.clone(),
            amount: self.airdrop.amount,
            token: self.airdrop.token.clone(),
            each: false,
            all: false,
            transfer_type: "airdrop".to_string(),
            full_command: self.airdrop.full_command.clone(),
            duration: self.airdrop.duration.as_secs(),
        }
    }

    async fn pay_out(&self, participants: &[String]) -> Result<(), SettlementError> {
        let request = self.transfer_request(participants);
        match self.gateway.submit_transfer(&request).await {
            Ok(response) if response.ok => Ok(()),
            Ok(response) => Err(SettlementError::Transfer(
                response
                    .error
                    .unwrap_or_else(|| "backend rejected the transfer".to_string()),
            )),
            Err(e) => Err(SettlementError::Transfer(e.to_string())),
        }
    }
}

#[async_trait]
impl SettlementHandler<Vec<String>> for AirdropSettlement {
    async fn settle(&self, settlement: Settlement<Vec<String>>) -> Result<(), SettlementError> {
        let participants = settlement.value;
        let airdrop = &self.airdrop;
        info!(
            "Airdrop {} closed ({:?}) with {} participants",
            settlement.key,
            settlement.cause,
            participants.len()
        );

        let mut description = format!(
            "{}'s airdrop of **{} {}** (\u{2248} ${}) ",
            mention(&airdrop.author_id),
            format_amount(airdrop.amount),
            airdrop.token,
            format_amount(airdrop.amount_in_usd)
        );

        let mentions: Vec<String> = participants.iter().map(|p| mention(p)).collect();
        let mut outcome = Ok(());
        if participants.is_empty() {
            description.push_str("has not been collected by anyone :person_shrugging:.");
        } else {
            match self.pay_out(&participants).await {
                Ok(()) => {
                    description.push_str(&format!(
                        "has been collected by {}!",
                        join_participants(&mentions)
                    ));
                }
                Err(e) => {
                    error!("Airdrop {} payout failed: {}", settlement.key, e);
                    description.push_str(&format!(
                        "could not be delivered to {}, please contact the admins.",
                        join_participants(&mentions)
                    ));
                    outcome = Err(e);
                }
            }
        }

        let edit = MessageEdit::embed(
            Embed::new(AIRDROP_TITLE, description)
                .footer(format!("{} users joined, ended", participants.len())),
        )
        .clear_components();

        if let Err(e) = self
            .surface
            .edit_message(&airdrop.channel_id, &airdrop.message_id, &edit)
            .await
        {
            // Best effort: a failed payout is the error worth reporting
            if outcome.is_ok() {
                outcome = Err(SettlementError::Surface(e.to_string()));
            } else {
                warn!("Could not close airdrop message {}: {}", airdrop.message_id, e);
            }
        }

        outcome
    }
}

/// `a`, `a and b`, `a, b and c`
pub fn join_participants(participants: &[String]) -> String {
    match participants {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}
