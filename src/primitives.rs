//! Primitive value types shared across the chain: hashes, addresses, amounts.

use crate::error::ChainError;

/// 32-byte SHA-256 content hash.
pub type Hash256 = [u8; 32];

/// 32-byte account/token address.
pub type Address = [u8; 32];

pub const ZERO_HASH: Hash256 = [0u8; 32];
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Well-known address of the native chain token, used as the default fee
/// token.
pub const NATIVE_TOKEN: Address = {
    let mut addr = [0u8; 32];
    addr[31] = 1;
    addr
};

/// Prices are fixed-point integers scaled by this factor (1.0 == 1_000_000).
pub const PRICE_SCALE: u128 = 1_000_000;

/// Collateralization ratios are expressed in basis points (150% == 15_000).
pub const RATIO_SCALE: u64 = 10_000;

/// Parse a 32-byte address from a hex string.
pub fn address_from_hex(s: &str) -> Result<Address, ChainError> {
    let bytes = hex::decode(s)
        .map_err(|e| ChainError::InvalidTransaction(format!("invalid hex address: {}", e)))?;
    if bytes.len() != 32 {
        return Err(ChainError::InvalidTransaction(format!(
            "address must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut addr = [0u8; 32];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_hex_roundtrip() {
        let addr = [7u8; 32];
        let parsed = address_from_hex(&hex::encode(addr)).unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_address_from_hex_rejects_short_input() {
        assert!(address_from_hex("abcd").is_err());
        assert!(address_from_hex("not hex").is_err());
    }
}
