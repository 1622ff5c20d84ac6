//! Decimal unit conversion (wei ⇄ ether / gwei)

use num_bigint::BigUint;

use crate::error::{Result, WireError};

/// Decimals of one ether
pub const ETHER: u32 = 18;
/// Decimals of one gwei
pub const GWEI: u32 = 9;

/// Render an integer amount as a decimal string with `decimals` places,
/// dropping trailing zeros of the fraction
pub fn format_units(amount: &BigUint, decimals: u32) -> String {
    let scale = BigUint::from(10u8).pow(decimals);
    let whole = amount / &scale;
    let fraction = amount % &scale;
    if fraction == BigUint::from(0u8) {
        return whole.to_string();
    }
    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// Parse a decimal string such as `"0.1"` into an integer amount
pub fn parse_units(text: &str, decimals: u32) -> Result<BigUint> {
    let trimmed = text.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !all_digits(whole)
        || !all_digits(fraction)
        || fraction.len() > decimals as usize
    {
        return Err(WireError::malformed(text));
    }

    let digits = format!(
        "{}{:0<width$}",
        whole,
        fraction,
        width = decimals as usize
    );
    BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| WireError::malformed(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        let tenth = BigUint::from(100_000_000_000_000_000u64);
        assert_eq!(format_units(&tenth, ETHER), "0.1");
        assert_eq!(format_units(&BigUint::from(0u8), ETHER), "0");
        assert_eq!(
            format_units(&BigUint::from(1_500_000_000_000_000_000u64), ETHER),
            "1.5"
        );
        assert_eq!(format_units(&BigUint::from(3_000_000_000u64), GWEI), "3");
        assert_eq!(format_units(&BigUint::from(1u8), ETHER), "0.000000000000000001");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("0.1", ETHER).unwrap(),
            BigUint::from(100_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_units("100", ETHER).unwrap(),
            BigUint::from(100u8) * BigUint::from(10u8).pow(18)
        );
        assert_eq!(parse_units(".5", GWEI).unwrap(), BigUint::from(500_000_000u64));
        assert_eq!(parse_units("3", GWEI).unwrap(), BigUint::from(3_000_000_000u64));
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(parse_units("", ETHER).is_err());
        assert!(parse_units(".", ETHER).is_err());
        assert!(parse_units("1e18", ETHER).is_err());
        assert!(parse_units("-1", ETHER).is_err());
        assert!(parse_units("0.0000000001", GWEI).is_err());
    }
}
