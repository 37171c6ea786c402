use std::{fmt, str::FromStr};

use primitive_types::U256;
use sha3::{Digest, Keccak256};

use crate::error::EncodingError;

pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn decode_hex(text: &str) -> Result<Vec<u8>, EncodingError> {
    let clean = text.trim();
    let clean = clean.strip_prefix("0x").unwrap_or(clean);
    let padded = if clean.len() % 2 == 1 {
        format!("0{clean}")
    } else {
        clean.to_string()
    };
    hex::decode(&padded).map_err(|e| EncodingError::InvalidHex(text.to_string(), e))
}

/// A 20 byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let raw: [u8; 20] = bytes
            .try_into()
            .map_err(|_| EncodingError::InvalidAddressLength(bytes.len()))?;
        Ok(Self(raw))
    }

    /// Left-padded with zeros, as an ABI argument or mapping key.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&decode_hex(s)?)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

fn parse_unsigned(what: &'static str, text: &str) -> Result<U256, EncodingError> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    // from_dec_str reads "" as zero
    if digits.is_empty() {
        return Err(EncodingError::InvalidInteger(what, text.to_string()));
    }
    let value = U256::from_dec_str(digits)
        .map_err(|_| EncodingError::InvalidInteger(what, text.to_string()))?;
    // "-0" is still zero
    if negative && !value.is_zero() {
        return Err(EncodingError::Negative(what));
    }
    Ok(value)
}

/// Parses a decimal balance, rejecting negative values.
pub fn parse_amount(text: &str) -> Result<U256, EncodingError> {
    parse_unsigned("amount", text)
}

pub fn parse_slot_index(text: &str) -> Result<u64, EncodingError> {
    let value = parse_unsigned("slot index", text)?;
    if value > U256::from(u64::MAX) {
        return Err(EncodingError::InvalidInteger("slot index", text.trim().to_string()));
    }
    Ok(value.low_u64())
}

pub fn to_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// `0x` plus 64 hex digits, as expected by the storage-write methods.
pub fn storage_word(amount: U256) -> String {
    format!("0x{}", hex::encode(to_word(amount)))
}

/// Decodes a big-endian hex result such as a storage word or an `eth_call` return.
pub fn decode_word(text: &str) -> Result<U256, EncodingError> {
    let bytes = decode_hex(text)?;
    if bytes.is_empty() {
        return Err(EncodingError::EmptyResult);
    }
    if bytes.len() > 32 {
        return Err(EncodingError::WordTooLong(bytes.len()));
    }
    Ok(U256::from_big_endian(&bytes))
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn balance_of_calldata(account: &Address) -> String {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector(BALANCE_OF_SIGNATURE));
    data.extend_from_slice(&account.to_word());
    format!("0x{}", hex::encode(data))
}

// Find the storage slot for an address in a Solidity mapping
// keccak256(h(k) + p) k -> address, p -> slot position
pub fn derive_mapping_slot(user: &Address, mapping_slot: u64) -> String {
    let mut buffer = [0u8; 64];

    buffer[..32].copy_from_slice(&user.to_word());
    buffer[32..].copy_from_slice(&to_word(U256::from(mapping_slot)));

    format!("0x{}", hex::encode(keccak256(&buffer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    const HOLDER: &str = "0xF977814e90dA44bFA03b6295A0616a897441aceC";

    #[test]
    fn test_weth_balance_slot() -> Result<()> {
        // Binance Wallet
        let holder: Address = HOLDER.parse().context("holder address")?;
        let slot = derive_mapping_slot(&holder, 3);
        assert_eq!(
            slot,
            "0x9cca97fb08ee88532e0983a3a051466c5df908292b6899f3cdc163eb9c0b22ba"
        );
        Ok(())
    }

    #[test]
    fn test_derivation_is_deterministic() -> Result<()> {
        let holder: Address = HOLDER.parse()?;
        for slot in [0, 1, 20, u32::MAX as u64] {
            let first = derive_mapping_slot(&holder, slot);
            let second = derive_mapping_slot(&holder, slot);
            assert_eq!(first, second);
            assert_eq!(first.len(), 66);
        }
        assert_ne!(
            derive_mapping_slot(&holder, 0),
            derive_mapping_slot(&holder, 1)
        );
        Ok(())
    }

    #[test]
    fn test_balance_of_calldata() -> Result<()> {
        assert_eq!(selector(BALANCE_OF_SIGNATURE), [0x70, 0xa0, 0x82, 0x31]);

        let holder: Address = HOLDER.parse()?;
        assert_eq!(
            balance_of_calldata(&holder),
            "0x70a08231000000000000000000000000f977814e90da44bfa03b6295a0616a897441acec"
        );
        Ok(())
    }

    #[test]
    fn test_address_length_is_checked() {
        let short = "0xf977814e90da44bfa03b6295a0616a897441ac";
        let long = "0xf977814e90da44bfa03b6295a0616a897441acec00";
        assert!(matches!(
            short.parse::<Address>(),
            Err(EncodingError::InvalidAddressLength(19))
        ));
        assert!(matches!(
            long.parse::<Address>(),
            Err(EncodingError::InvalidAddressLength(21))
        ));
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(EncodingError::InvalidHex(..))
        ));
    }

    #[test]
    fn test_address_display_is_lowercase() -> Result<()> {
        let holder: Address = HOLDER.parse()?;
        assert_eq!(holder.to_string(), HOLDER.to_lowercase());
        // odd digit count gets one leading zero
        let odd: Address = format!("0x1{}", "0".repeat(38)).parse()?;
        assert_eq!(odd.to_string(), format!("0x01{}", "0".repeat(38)));
        Ok(())
    }

    #[test]
    fn test_negative_inputs_are_rejected() {
        assert!(matches!(
            parse_amount("-1"),
            Err(EncodingError::Negative("amount"))
        ));
        assert!(matches!(
            parse_slot_index("-3"),
            Err(EncodingError::Negative("slot index"))
        ));
        assert!(matches!(
            parse_amount("12abc"),
            Err(EncodingError::InvalidInteger("amount", _))
        ));
        for empty in ["", "+", "-", "  "] {
            assert!(
                matches!(
                    parse_amount(empty),
                    Err(EncodingError::InvalidInteger("amount", _))
                ),
                "{empty:?} should be rejected"
            );
        }
        assert!(matches!(
            parse_slot_index(""),
            Err(EncodingError::InvalidInteger("slot index", _))
        ));
    }

    #[test]
    fn test_negative_zero_is_zero() -> Result<()> {
        assert_eq!(parse_amount("-0")?, U256::zero());
        assert_eq!(parse_slot_index("-0")?, 0);
        assert!(matches!(
            parse_amount("-00001"),
            Err(EncodingError::Negative("amount"))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_amount_full_range() -> Result<()> {
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_amount(max)?, U256::MAX);
        assert_eq!(parse_amount("1000000")?, U256::from(1_000_000u64));
        assert!(parse_amount(&format!("{max}0")).is_err());
        assert_eq!(parse_slot_index("20")?, 20);
        Ok(())
    }

    #[test]
    fn test_storage_word_extremes() -> Result<()> {
        let zero = storage_word(U256::zero());
        assert_eq!(zero, format!("0x{}", "0".repeat(64)));
        assert_eq!(decode_word(&zero)?, U256::zero());

        let max = storage_word(U256::MAX);
        assert_eq!(max, format!("0x{}", "f".repeat(64)));
        assert_eq!(decode_word(&max)?, U256::MAX);
        Ok(())
    }

    #[test]
    fn test_decode_word() -> Result<()> {
        assert_eq!(decode_word("0x64")?, U256::from(100));
        assert_eq!(decode_word("0x0")?, U256::zero());
        assert!(matches!(decode_word("0x"), Err(EncodingError::EmptyResult)));
        assert!(matches!(
            decode_word(&format!("0x{}", "ab".repeat(33))),
            Err(EncodingError::WordTooLong(33))
        ));
        Ok(())
    }
}
