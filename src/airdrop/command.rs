//! Parsing of `airdrop <amount> <token> [in <duration>] [for <entries>]`

use std::time::Duration;

use serde_json::json;

use super::buttons::{ConfirmButton, CANCEL_ID};
use super::format_amount;
use crate::chat::{Embed, MessageEdit};
use crate::validation::{
    validate_amount, validate_duration, validate_max_entries, validate_snowflake,
    validate_token_symbol, ValidationError,
};

/// Arguments of an airdrop command, before the author confirmed it
#[derive(Debug, Clone, PartialEq)]
pub struct AirdropArgs {
    pub author_id: String,
    pub amount: f64,
    pub token: String,
    pub duration_secs: u64,
    pub max_entries: u32,
}

impl AirdropArgs {
    /// Parse the words following the command name.
    ///
    /// `default_duration` applies when no `in <duration>` clause is given.
    pub fn parse(
        author_id: &str,
        args: &[&str],
        default_duration: Duration,
    ) -> Result<Self, ValidationError> {
        validate_snowflake(author_id)?;

        let (amount, token, rest) = match args {
            [amount, token, rest @ ..] => (*amount, *token, rest),
            [_] => return Err(ValidationError::MissingParameter("token".to_string())),
            [] => return Err(ValidationError::MissingParameter("amount".to_string())),
        };
        validate_token_symbol(token)?;

        let mut parsed = Self {
            author_id: author_id.to_string(),
            amount: validate_amount(amount)?,
            token: token.to_uppercase(),
            duration_secs: default_duration.as_secs(),
            max_entries: 0,
        };

        let mut words = rest.iter();
        while let Some(word) = words.next() {
            let value = words
                .next()
                .ok_or_else(|| ValidationError::MissingParameter(word.to_string()))?;
            match word.to_lowercase().as_str() {
                "in" => parsed.duration_secs = parse_duration(value)?,
                "for" => parsed.max_entries = validate_max_entries(value)?,
                other => {
                    return Err(ValidationError::InvalidParameter(format!(
                        "unexpected '{}'",
                        other
                    )))
                }
            }
        }

        validate_duration(&parsed.duration_secs.to_string())?;
        Ok(parsed)
    }

    /// Confirmation button for these arguments, priced at `amount_in_usd`
    pub fn confirm_button(&self, amount_in_usd: f64) -> ConfirmButton {
        ConfirmButton {
            author_id: self.author_id.clone(),
            amount: self.amount,
            amount_in_usd,
            token: self.token.clone(),
            duration_secs: self.duration_secs,
            max_entries: self.max_entries,
        }
    }

    /// Message asking the author to confirm or cancel the airdrop
    pub fn confirmation(&self, amount_in_usd: f64) -> MessageEdit {
        let amount = format!(
            "**{} {}** (\u{2248} ${})",
            format_amount(self.amount),
            self.token,
            format_amount(amount_in_usd)
        );
        let max_entries = match self.max_entries {
            0 => "-".to_string(),
            n => n.to_string(),
        };
        let description = format!(
            "Are you sure you want to spend {} on this airdrop?\nRun time: {}\nMax entries: {}",
            amount,
            describe_run_time(self.duration_secs),
            max_entries
        );

        MessageEdit {
            embeds: vec![Embed::new(":airplane: Confirm airdrop", description)],
            components: Some(vec![json!({
                "type": 1,
                "components": [
                    {
                        "type": 2,
                        "style": 1,
                        "label": "Confirm",
                        "custom_id": self.confirm_button(amount_in_usd).custom_id(),
                    },
                    {
                        "type": 2,
                        "style": 4,
                        "label": "Cancel",
                        "custom_id": CANCEL_ID,
                    },
                ],
            })]),
        }
    }
}

/// `90`, `90s`, `100sec`, `5m`, `1h`
pub fn parse_duration(value: &str) -> Result<u64, ValidationError> {
    let lower = value.to_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (digits, unit) = lower.split_at(split);

    let multiplier = match unit {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hour" => 3600,
        _ => {
            return Err(ValidationError::InvalidParameter(format!(
                "unknown duration '{}'",
                value
            )))
        }
    };

    digits
        .parse::<u64>()
        .map(|n| n.saturating_mul(multiplier))
        .map_err(|_| ValidationError::InvalidParameter(format!("unknown duration '{}'", value)))
}

/// `1h2m3s`, `3m`, `45s`
pub fn describe_run_time(duration_secs: u64) -> String {
    let hours = duration_secs / 3600;
    let mins = (duration_secs % 3600) / 60;
    let secs = duration_secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || mins > 0 {
        out.push_str(&format!("{}m", mins));
    }
    if secs > 0 {
        out.push_str(&format!("{}s", secs));
    }
    out
}
