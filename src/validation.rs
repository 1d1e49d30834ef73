use thiserror::Error;

/// Longest airdrop window accepted from a button
pub const MAX_AIRDROP_DURATION_SECS: u64 = 60 * 60;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid custom id: {0}")]
    InvalidCustomId(String),

    #[error("Invalid Discord id: {0}")]
    InvalidSnowflake(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub fn validate_snowflake(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MissingParameter("id".to_string()));
    }

    // Discord snowflakes are 64-bit integers rendered in decimal
    if id.len() > 20 || id.parse::<u64>().is_err() {
        return Err(ValidationError::InvalidSnowflake(id.to_string()));
    }

    Ok(())
}

pub fn validate_amount(amount: &str) -> Result<f64, ValidationError> {
    match amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ValidationError::InvalidParameter(format!(
            "amount must be a positive number, got '{}'",
            amount
        ))),
    }
}

pub fn validate_duration(duration: &str) -> Result<u64, ValidationError> {
    match duration.parse::<u64>() {
        Ok(secs) if secs > 0 && secs <= MAX_AIRDROP_DURATION_SECS => Ok(secs),
        _ => Err(ValidationError::InvalidParameter(format!(
            "duration must be between 1 and {} seconds, got '{}'",
            MAX_AIRDROP_DURATION_SECS, duration
        ))),
    }
}

/// `0` means unlimited entries
pub fn validate_max_entries(max_entries: &str) -> Result<u32, ValidationError> {
    max_entries.parse::<u32>().map_err(|_| {
        ValidationError::InvalidParameter(format!(
            "max entries must be a non-negative integer, got '{}'",
            max_entries
        ))
    })
}

pub fn validate_token_symbol(token: &str) -> Result<(), ValidationError> {
    if token.trim().is_empty() {
        return Err(ValidationError::MissingParameter("token".to_string()));
    }

    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidParameter(format!(
            "token symbol must be alphanumeric, got '{}'",
            token
        )));
    }

    Ok(())
}
