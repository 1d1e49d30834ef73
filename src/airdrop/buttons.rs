//! Custom ids carried by the airdrop buttons
//!
//! Everything the flow needs after the confirmation step travels inside the
//! button's custom id, so a press can be handled without any other state.

use crate::validation::{
    validate_amount, validate_duration, validate_max_entries, validate_snowflake,
    validate_token_symbol, ValidationError,
};

pub const CONFIRM_PREFIX: &str = "confirm_airdrop_off";
pub const ENTER_PREFIX: &str = "enter_airdrop_off";
pub const CANCEL_ID: &str = "cancel_airdrop";

const SEPARATOR: char = '-';

/// Confirmation button shown to the airdrop author
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmButton {
    pub author_id: String,
    pub amount: f64,
    pub amount_in_usd: f64,
    pub token: String,
    pub duration_secs: u64,
    pub max_entries: u32,
}

impl ConfirmButton {
    pub fn custom_id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}-{}-{}",
            CONFIRM_PREFIX,
            self.author_id,
            self.amount,
            self.amount_in_usd,
            self.token,
            self.duration_secs,
            self.max_entries
        )
    }

    pub fn parse(custom_id: &str) -> Result<Self, ValidationError> {
        let parts = split(custom_id, CONFIRM_PREFIX, 6)?;

        validate_snowflake(parts[0])?;
        validate_token_symbol(parts[3])?;

        Ok(Self {
            author_id: parts[0].to_string(),
            amount: validate_amount(parts[1])?,
            amount_in_usd: parse_usd(parts[2])?,
            token: parts[3].to_string(),
            duration_secs: validate_duration(parts[4])?,
            max_entries: validate_max_entries(parts[5])?,
        })
    }
}

/// Button participants press to enter a live airdrop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterButton {
    pub author_id: String,
    pub duration_secs: u64,
    pub max_entries: u32,
}

impl EnterButton {
    pub fn custom_id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            ENTER_PREFIX, self.author_id, self.duration_secs, self.max_entries
        )
    }

    pub fn parse(custom_id: &str) -> Result<Self, ValidationError> {
        let parts = split(custom_id, ENTER_PREFIX, 3)?;

        validate_snowflake(parts[0])?;

        Ok(Self {
            author_id: parts[0].to_string(),
            duration_secs: validate_duration(parts[1])?,
            max_entries: validate_max_entries(parts[2])?,
        })
    }
}

fn split<'a>(
    custom_id: &'a str,
    prefix: &str,
    fields: usize,
) -> Result<Vec<&'a str>, ValidationError> {
    let mut parts = custom_id.split(SEPARATOR);
    if parts.next() != Some(prefix) {
        return Err(ValidationError::InvalidCustomId(custom_id.to_string()));
    }

    let rest: Vec<&str> = parts.collect();
    if rest.len() != fields {
        return Err(ValidationError::InvalidCustomId(custom_id.to_string()));
    }
    Ok(rest)
}

fn parse_usd(value: &str) -> Result<f64, ValidationError> {
    match value.parse::<f64>() {
        Ok(usd) if usd.is_finite() && usd >= 0.0 => Ok(usd),
        _ => Err(ValidationError::InvalidParameter(format!(
            "usd amount must be a non-negative number, got '{}'",
            value
        ))),
    }
}
