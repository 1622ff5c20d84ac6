//! Deposit Notes
//!
//! A note is the secret a depositor keeps to withdraw later.
//!
//! ```text
//! Note = {
//!     label:     "0.1" | "1" | ...   // denomination
//!     net_id:    u64,                // chain the pool lives on
//!     nullifier: [u8; 31],           // little-endian uint248
//!     secret:    [u8; 31],           // little-endian uint248
//! }
//!
//! preimage    = nullifier || secret                       (62 bytes)
//! note string = tornado-eth-<label>-<net_id>-0x<hex(preimage)>
//! ```

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use std::fmt;
use std::str::FromStr;

use crate::error::PrivacyError;

/// Leading tag of every note string
pub const NOTE_PREFIX: &str = "tornado";

const CURRENCY: &str = "eth";
const FIELD_BYTES: usize = 31;
const PREIMAGE_BYTES: usize = FIELD_BYTES * 2;

#[derive(Clone, PartialEq, Eq)]
pub struct Note {
    pub label: String,
    pub net_id: u64,
    nullifier: [u8; FIELD_BYTES],
    secret: [u8; FIELD_BYTES],
}

impl Note {
    pub fn new(
        label: impl Into<String>,
        net_id: u64,
        nullifier: [u8; FIELD_BYTES],
        secret: [u8; FIELD_BYTES],
    ) -> Self {
        Self {
            label: label.into(),
            net_id,
            nullifier,
            secret,
        }
    }

    /// Fresh note with random nullifier and secret
    pub fn random<R: RngCore + CryptoRng>(label: impl Into<String>, net_id: u64, rng: &mut R) -> Self {
        let mut nullifier = [0u8; FIELD_BYTES];
        let mut secret = [0u8; FIELD_BYTES];
        rng.fill_bytes(&mut nullifier);
        rng.fill_bytes(&mut secret);
        Self::new(label, net_id, nullifier, secret)
    }

    pub fn nullifier_bytes(&self) -> &[u8; FIELD_BYTES] {
        &self.nullifier
    }

    pub fn nullifier_value(&self) -> BigUint {
        BigUint::from_bytes_le(&self.nullifier)
    }

    pub fn secret_value(&self) -> BigUint {
        BigUint::from_bytes_le(&self.secret)
    }

    pub fn preimage(&self) -> [u8; PREIMAGE_BYTES] {
        let mut preimage = [0u8; PREIMAGE_BYTES];
        preimage[..FIELD_BYTES].copy_from_slice(&self.nullifier);
        preimage[FIELD_BYTES..].copy_from_slice(&self.secret);
        preimage
    }
}

// Keep the secret halves out of logs.
impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("label", &self.label)
            .field("net_id", &self.net_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-0x{}",
            NOTE_PREFIX,
            CURRENCY,
            self.label,
            self.net_id,
            hex::encode(self.preimage())
        )
    }
}

impl FromStr for Note {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PrivacyError::InvalidNote(reason.to_string());

        let parts: Vec<&str> = s.trim().split('-').collect();
        let [prefix, currency, label, net_id, body] = parts.as_slice() else {
            return Err(invalid("expected tornado-<currency>-<amount>-<netId>-0x<hex>"));
        };
        if *prefix != NOTE_PREFIX {
            return Err(invalid("missing tornado prefix"));
        }
        if !currency.eq_ignore_ascii_case(CURRENCY) {
            return Err(invalid("only eth notes are supported"));
        }
        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return Err(invalid("malformed amount"));
        }
        let net_id: u64 = net_id.parse().map_err(|_| invalid("malformed net id"))?;

        let digits = body
            .strip_prefix("0x")
            .ok_or_else(|| invalid("preimage must start with 0x"))?;
        if digits.len() != PREIMAGE_BYTES * 2 {
            return Err(invalid("preimage must be 124 hex digits"));
        }
        let bytes = hex::decode(digits).map_err(|_| invalid("preimage is not hex"))?;

        let mut nullifier = [0u8; FIELD_BYTES];
        let mut secret = [0u8; FIELD_BYTES];
        nullifier.copy_from_slice(&bytes[..FIELD_BYTES]);
        secret.copy_from_slice(&bytes[FIELD_BYTES..]);
        Ok(Self::new(*label, net_id, nullifier, secret))
    }
}
