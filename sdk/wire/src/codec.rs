//! Hex encoding and strict decoding of wire primitives
//!
//! | Kind     | Encoded as                              | Decoder accepts          |
//! |----------|-----------------------------------------|--------------------------|
//! | address  | 40 hex digits                           | exactly 40 hex digits    |
//! | 32 bytes | 64 hex digits                           | exactly 64 hex digits    |
//! | quantity | minimal hex, `0x0` for zero             | 1 to 64 hex digits       |
//! | bytes    | two digits per byte                     | even number of digits    |

use num_bigint::BigUint;
use serde_json::Value;

use crate::error::{Result, WireError};
use crate::primitives::{Address, BlockTag, Bytes, H256};

const MAX_QUANTITY_DIGITS: usize = 64;

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_address(address: &Address) -> String {
    address.to_string()
}

pub fn encode_h256(value: &H256) -> String {
    value.to_string()
}

pub fn encode_quantity(value: &BigUint) -> String {
    format!("0x{:x}", value)
}

pub fn encode_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

pub fn encode_bytes(value: &[u8]) -> String {
    format!("0x{}", hex::encode(value))
}

pub fn encode_block_tag(tag: BlockTag) -> String {
    match tag {
        BlockTag::Latest => "latest".to_string(),
        BlockTag::Number(n) => encode_u64(n),
    }
}

// ============================================================================
// String-level parsing
// ============================================================================

/// Strip the mandatory `0x` prefix and check the remainder is hex
fn hex_digits(text: &str) -> Result<&str> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| WireError::malformed(text))?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WireError::malformed(text));
    }
    Ok(digits)
}

fn fixed_width<const N: usize>(text: &str) -> Result<[u8; N]> {
    let digits = hex_digits(text)?;
    if digits.len() != N * 2 {
        return Err(WireError::malformed(text));
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|_| WireError::malformed(text))?;
    Ok(out)
}

pub fn parse_address(text: &str) -> Result<Address> {
    fixed_width::<20>(text).map(Address)
}

pub fn parse_h256(text: &str) -> Result<H256> {
    fixed_width::<32>(text).map(H256)
}

pub fn parse_quantity(text: &str) -> Result<BigUint> {
    let digits = hex_digits(text)?;
    if digits.is_empty() || digits.len() > MAX_QUANTITY_DIGITS {
        return Err(WireError::malformed(text));
    }
    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| WireError::malformed(text))
}

pub fn parse_bytes(text: &str) -> Result<Bytes> {
    let digits = hex_digits(text)?;
    if digits.len() % 2 != 0 {
        return Err(WireError::malformed(text));
    }
    hex::decode(digits)
        .map(Bytes)
        .map_err(|_| WireError::malformed(text))
}

// ============================================================================
// JSON-level decoding
// ============================================================================

fn as_wire_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| WireError::malformed(value.to_string()))
}

pub fn decode_address(value: &Value) -> Result<Address> {
    parse_address(as_wire_str(value)?)
}

pub fn decode_h256(value: &Value) -> Result<H256> {
    parse_h256(as_wire_str(value)?)
}

pub fn decode_quantity(value: &Value) -> Result<BigUint> {
    parse_quantity(as_wire_str(value)?)
}

/// Decode a quantity that must fit in 64 bits (block numbers, nonces, gas)
pub fn decode_u64(value: &Value) -> Result<u64> {
    let text = as_wire_str(value)?;
    let quantity = parse_quantity(text)?;
    u64::try_from(&quantity).map_err(|_| WireError::malformed(text))
}

pub fn decode_bytes(value: &Value) -> Result<Bytes> {
    parse_bytes(as_wire_str(value)?)
}
