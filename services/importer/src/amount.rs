//! Monetary amounts written with a decimal comma (`1234,56`, `1.234,56`)

use crate::error::RowError;

/// Parse a protested amount
///
/// A `R$` currency mark and any whitespace are ignored. When a comma is
/// present it is the decimal separator and dots are thousands separators.
/// Without a comma the value is read as-is.
pub fn parse_amount(raw: &str) -> Result<f64, RowError> {
    let cleaned: String = raw
        .replace("R$", "")
        .replace("r$", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let invalid = || RowError::InvalidAmount {
        value: raw.to_string(),
    };

    if cleaned.is_empty() {
        return Err(invalid());
    }

    let normalized = if cleaned.contains(',') {
        if cleaned.matches(',').count() > 1 {
            return Err(invalid());
        }
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    // Only plain decimal notation; `f64::from_str` would also take "inf" and "1e3".
    let plain = normalized
        .strip_prefix('-')
        .unwrap_or(&normalized)
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b'.');
    if !plain {
        return Err(invalid());
    }

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_decimal_comma() {
        assert_eq!(parse_amount("1234,56").unwrap(), 1234.56);
    }

    #[test]
    fn test_parse_amount_thousands_separator() {
        assert_eq!(parse_amount("1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_amount("1.234.567,89").unwrap(), 1234567.89);
    }

    #[test]
    fn test_parse_amount_decimal_point() {
        assert_eq!(parse_amount("1234.56").unwrap(), 1234.56);
    }

    #[test]
    fn test_parse_amount_integer_and_whitespace() {
        assert_eq!(parse_amount("  500 ").unwrap(), 500.0);
        assert_eq!(parse_amount("0,5").unwrap(), 0.5);
    }

    #[test]
    fn test_parse_amount_currency_mark() {
        assert_eq!(parse_amount("R$ 10,00").unwrap(), 10.0);
        assert_eq!(parse_amount("r$1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_amount("R$ 1 234,56").unwrap(), 1234.56);
    }

    #[test]
    fn test_parse_amount_negative() {
        assert_eq!(parse_amount("-10,00").unwrap(), -10.0);
    }

    #[test]
    fn test_parse_amount_invalid() {
        for raw in ["", "   ", "R$", "abc", "12,34,56", "US$ 10,00", "inf", "NaN", "1e3", "-", "1,2a"] {
            let err = parse_amount(raw).unwrap_err();
            assert!(
                matches!(err, RowError::InvalidAmount { ref value } if value == raw),
                "expected InvalidAmount for {:?}",
                raw
            );
        }
    }
}
