use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point drift.
/// A fee of 50.00 is stored as 5000.
pub type Cents = i64;

/// Largest single credit adjustment accepted (99,999,999.99).
pub const MAX_ADJUSTMENT: Cents = 9_999_999_999;

/// Smallest manual deposit accepted (1.00). Withdrawals only need to be positive.
pub const MIN_DEPOSIT: Cents = 100;

/// Format cents as a decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid money format: {0}")]
    InvalidFormat(String),

    #[error("amount too large: {0}")]
    Overflow(String),
}

/// Parse a decimal string into cents. Digits past the second decimal place
/// are truncated.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let invalid = || ParseCentsError::InvalidFormat(trimmed.to_string());
    let overflow = || ParseCentsError::Overflow(trimmed.to_string());

    let (units_str, fraction_str) = match digits.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (digits, ""),
    };

    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(invalid());
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !fraction_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| overflow())?
    };

    let fraction: i64 = match fraction_str.len() {
        0 => 0,
        1 => fraction_str.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => fraction_str[..2].parse().map_err(|_| invalid())?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(overflow)?;

    Ok(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-1234), "-12.34");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(" 12.34 "), Ok(1234));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-20.00"), Ok(-2000));
        assert_eq!(parse_cents("100.999"), Ok(10099));
    }

    #[test]
    fn test_parse_cents_rejects_garbage() {
        assert_eq!(parse_cents(""), Err(ParseCentsError::Empty));
        assert!(matches!(
            parse_cents("abc"),
            Err(ParseCentsError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cents("1.2.3"),
            Err(ParseCentsError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cents("."),
            Err(ParseCentsError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cents("1e5"),
            Err(ParseCentsError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_cents_overflow() {
        assert!(matches!(
            parse_cents("999999999999999999999"),
            Err(ParseCentsError::Overflow(_))
        ));
    }
}
