use crate::{
    scoring::{MAX_NUMBER, MIN_NUMBER},
    ValidationError,
};

const WALLET_MIN_BODY_LEN: usize = 25;
const WALLET_MAX_BODY_LEN: usize = 34;

fn is_base58(c: char) -> bool {
    matches!(c, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

/// Validate a game wallet address: `r` followed by 25 to 34 base58 characters.
pub fn validate_wallet_address(address: &str) -> Result<&str, ValidationError> {
    let address = address.trim();
    let invalid = || ValidationError::InvalidWalletAddress(address.to_string());
    let body = address.strip_prefix('r').ok_or_else(invalid)?;
    if !(WALLET_MIN_BODY_LEN..=WALLET_MAX_BODY_LEN).contains(&body.len()) {
        return Err(invalid());
    }
    if !body.chars().all(is_base58) {
        return Err(invalid());
    }
    Ok(address)
}

/// Validate and normalize a payment (EVM) address: `0x` followed by 20 hex encoded bytes.
///
/// Returns the lowercase form, which is used as the paid-set key.
pub fn normalize_payment_address(address: &str) -> Result<String, ValidationError> {
    let address = address.trim();
    let invalid = || ValidationError::InvalidPaymentAddress(address.to_string());
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    let bytes = hex::decode(body).map_err(|_| invalid())?;
    if bytes.len() != 20 {
        return Err(invalid());
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Validate a username.
pub fn validate_username(username: &str) -> Result<&str, ValidationError> {
    let username = username.trim();
    if username.is_empty() {
        Err(ValidationError::EmptyUsername)
    } else {
        Ok(username)
    }
}

/// Parse a number typed by the player.
pub fn parse_number(input: &str) -> Result<u8, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidNumber(trimmed.to_string());
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let number = trimmed.parse::<u8>().map_err(|_| invalid())?;
    if (MIN_NUMBER..=MAX_NUMBER).contains(&number) {
        Ok(number)
    } else {
        Err(invalid())
    }
}
