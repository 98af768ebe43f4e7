use alloy::primitives::Address;
use thiserror::Error;

/// Errors raised by purchase-input validation. Validation runs before
/// any encryption or network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be a positive integer: {0:?}")]
    InvalidAmount(String),

    #[error("invalid recipient address: {0:?}")]
    InvalidRecipient(String),
}

/// A validated purchase submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseRequest {
    /// Purchase amount; the contract encrypts amounts as 32-bit values.
    pub amount: u32,
    pub recipient: Address,
}

impl PurchaseRequest {
    /// Parse and validate raw user input.
    ///
    /// The amount must be a positive integer fitting the contract's
    /// 32-bit encrypted amount; the recipient must be `0x` followed by
    /// exactly 40 hex characters.
    pub fn parse(amount: &str, recipient: &str) -> Result<Self, ValidationError> {
        let amount = amount.trim();
        let value: u64 = amount
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?;
        if value == 0 {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        let value = u32::try_from(value)
            .map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?;

        let recipient = recipient.trim();
        if !is_hex_address(recipient) {
            return Err(ValidationError::InvalidRecipient(recipient.to_string()));
        }
        let recipient = recipient
            .parse()
            .map_err(|_| ValidationError::InvalidRecipient(recipient.to_string()))?;

        Ok(Self {
            amount: value,
            recipient,
        })
    }
}

/// `0x` followed by exactly 40 hex characters.
fn is_hex_address(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
