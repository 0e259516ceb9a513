//! Ethereum address helpers.
//!
//! Lock addresses are compared case-insensitively everywhere, but remote
//! services expect the EIP-55 mixed-case form in request paths.

use sha3::{Digest, Keccak256};
use thiserror::Error;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be 20 bytes (40 hex chars): {0}")]
    InvalidLength(String),
    #[error("address contains non-hex characters: {0}")]
    InvalidHex(String),
}

/// Validate `address` and return it in EIP-55 checksum form.
pub fn checksum_address(address: &str) -> Result<String, AddressError> {
    let trimmed = address.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AddressError::MissingPrefix(address.to_string()))?;

    if body.len() != 40 {
        return Err(AddressError::InvalidLength(address.to_string()));
    }
    if hex::decode(body).is_err() {
        return Err(AddressError::InvalidHex(address.to_string()));
    }

    let lower = body.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Case-insensitive address comparison.
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub fn is_zero_address(address: &str) -> bool {
    same_address(address, ZERO_ADDRESS)
}

/// First four bytes of keccak-256 over a Solidity function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
