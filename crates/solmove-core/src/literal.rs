//! Transpile-time evaluation of numeric literals.

use num_bigint::BigUint;
use num_traits::{One, Zero};

fn unit_multiplier(unit: &str) -> Option<u64> {
    Some(match unit {
        "wei" | "seconds" => 1,
        "gwei" => 1_000_000_000,
        "szabo" => 1_000_000_000_000,
        "finney" => 1_000_000_000_000_000,
        "ether" => 1_000_000_000_000_000_000,
        "minutes" => 60,
        "hours" => 3_600,
        "days" => 86_400,
        "weeks" => 604_800,
        _ => return None,
    })
}

/// Parses Solidity numeric literal text (`42`, `1_000`, `0xff`, `1e18`, `2.5 ether`) to its exact
/// integer value. Returns `None` for anything that does not denote a non-negative integer.
pub fn parse_number(text: &str) -> Option<BigUint> {
    let text = text.trim();
    let (number, unit) = match text.split_once(char::is_whitespace) {
        Some((n, u)) => (n, Some(u.trim())),
        None => (text, None),
    };
    let number: String = number.chars().filter(|c| *c != '_').collect();

    let value = if let Some(hex) = number
        .strip_prefix("0x")
        .or_else(|| number.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return None;
        }
        let value = BigUint::parse_bytes(hex.as_bytes(), 16)?;
        return Some(value * BigUint::from(unit_multiplier(unit.unwrap_or("wei"))?));
    } else {
        parse_decimal(&number)?
    };

    let (mantissa, scale) = value;
    let multiplier = BigUint::from(unit_multiplier(unit.unwrap_or("wei"))?);
    let numerator = mantissa * multiplier;
    let divisor = BigUint::from(10u32).pow(scale);
    if (&numerator % &divisor).is_zero() {
        Some(numerator / divisor)
    } else {
        None
    }
}

/// Decimal text with optional fraction and exponent as `(digits, decimal places)`.
fn parse_decimal(text: &str) -> Option<(BigUint, u32)> {
    let (base, exponent) = match text.split_once(['e', 'E']) {
        Some((b, e)) => (b, e.parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (int_part, frac_part) = match base.split_once('.') {
        Some((i, f)) => (i, f),
        None => (base, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits = format!("{}{}", int_part, frac_part);
    let mantissa = BigUint::parse_bytes(digits.as_bytes(), 10)?;
    let scale = frac_part.len() as i64 - exponent;
    if scale >= 0 {
        Some((mantissa, scale as u32))
    } else {
        let shift = u32::try_from(-scale).ok()?;
        Some((mantissa * BigUint::from(10u32).pow(shift), 0))
    }
}

/// `2^bits - 1`
pub fn unsigned_max(bits: u16) -> BigUint {
    (BigUint::one() << bits as usize) - BigUint::one()
}

/// `2^(bits-1) - 1`
pub fn signed_max(bits: u16) -> BigUint {
    (BigUint::one() << (bits as usize - 1)) - BigUint::one()
}

/// Magnitude of the most negative value of a signed type, `2^(bits-1)`.
pub fn signed_min_magnitude(bits: u16) -> BigUint {
    BigUint::one() << (bits as usize - 1)
}

pub fn fits_unsigned(value: &BigUint, bits: u16) -> bool {
    value.bits() <= bits as u64
}

/// Folds `base ** exponent`, refusing results wider than 256 bits.
pub fn fold_pow(base: &BigUint, exponent: &BigUint) -> Option<BigUint> {
    let exp: u32 = u32::try_from(exponent).ok()?;
    if base.is_zero() || base.is_one() {
        return Some(if exp == 0 { BigUint::one() } else { base.clone() });
    }
    if (base.bits() - 1) * exp as u64 > 256 {
        return None;
    }
    let result = base.pow(exp);
    if fits_unsigned(&result, 256) {
        Some(result)
    } else {
        None
    }
}

/// Big-endian bytes of `value`, left-padded to `width` bytes.
pub fn to_be_bytes_padded(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= width {
        return bytes;
    }
    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend(bytes);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u128) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_plain_and_separated() {
        assert_eq!(parse_number("42"), Some(n(42)));
        assert_eq!(parse_number("1_000_000"), Some(n(1_000_000)));
        assert_eq!(parse_number("0xff"), Some(n(255)));
    }

    #[test]
    fn test_scientific_and_units() {
        assert_eq!(parse_number("1e18"), Some(n(1_000_000_000_000_000_000)));
        assert_eq!(parse_number("1 ether"), Some(n(1_000_000_000_000_000_000)));
        assert_eq!(parse_number("2.5 gwei"), Some(n(2_500_000_000)));
        assert_eq!(parse_number("1 days"), Some(n(86_400)));
        assert_eq!(parse_number("1.5"), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_type_bounds() {
        assert_eq!(unsigned_max(24), n(16_777_215));
        assert_eq!(unsigned_max(8), n(255));
        assert_eq!(signed_max(8), n(127));
        assert_eq!(signed_min_magnitude(8), n(128));
    }

    #[test]
    fn test_fold_pow() {
        assert_eq!(fold_pow(&n(10), &n(18)), Some(n(1_000_000_000_000_000_000)));
        assert_eq!(fold_pow(&n(2), &n(255)).map(|v| v.bits()), Some(256));
        assert_eq!(fold_pow(&n(2), &n(256)), None);
        assert_eq!(fold_pow(&n(7), &n(0)), Some(n(1)));
    }
}
