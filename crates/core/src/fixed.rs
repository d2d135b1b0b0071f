//! Fixed-point codec between decimal values and scaled integers.
//!
//! Every price and volume inside a book is held as an `i64` equal to
//! `value * 10^precision`. Map keys, comparisons and sums operate on these
//! integers only, so two textual spellings of the same price (`"0.1839"` and
//! `"0.18390"`) always land on the same key.
//!
//! Parsing goes through [`rust_decimal::Decimal`], never through binary
//! floating point. An `f64` input is first rendered to its shortest
//! round-trip text, which is the literal the caller wrote.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// A price multiplied by `10^price_precision`.
pub type ScaledPrice = i64;

/// A volume multiplied by `10^volume_precision`.
pub type ScaledVolume = i64;

/// Largest supported precision: `10^18` is the biggest power of ten in `i64`.
pub const MAX_PRECISION: u32 = 18;

/// Errors raised while converting decimal input into scaled integers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input is not a decimal number.
    #[error("invalid decimal value: {input:?}")]
    InvalidNumber { input: String },
    /// The scaled value does not fit in an `i64`.
    #[error("{input} does not fit a scaled integer at precision {precision}")]
    Overflow { input: String, precision: u32 },
    /// The requested precision exceeds [`MAX_PRECISION`].
    #[error("unsupported precision {0}, maximum is {MAX_PRECISION}")]
    UnsupportedPrecision(u32),
}

/// Anything that can be read as an exact decimal value.
pub trait DecimalInput {
    /// Convert to a [`Decimal`] without binary floating-point rounding.
    fn to_decimal(&self) -> Result<Decimal, ParseError>;
}

impl DecimalInput for str {
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        let text = self.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|_| ParseError::InvalidNumber {
                input: self.to_string(),
            })
    }
}

impl DecimalInput for String {
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        self.as_str().to_decimal()
    }
}

impl DecimalInput for Decimal {
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        Ok(*self)
    }
}

impl DecimalInput for i64 {
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        Ok(Decimal::from(*self))
    }
}

impl DecimalInput for u64 {
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        Ok(Decimal::from(*self))
    }
}

impl DecimalInput for f64 {
    /// `f64` display is the shortest text that round-trips, so `0.18394`
    /// becomes exactly `Decimal("0.18394")`.
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        if !self.is_finite() {
            return Err(ParseError::InvalidNumber {
                input: self.to_string(),
            });
        }
        self.to_string().as_str().to_decimal()
    }
}

impl<T: DecimalInput + ?Sized> DecimalInput for &T {
    fn to_decimal(&self) -> Result<Decimal, ParseError> {
        (**self).to_decimal()
    }
}

/// Convert a decimal value to `round(value * 10^precision)`.
///
/// Rounding is half-to-even. Fails with [`ParseError::InvalidNumber`] on
/// non-numeric input and [`ParseError::Overflow`] when the result does not
/// fit in an `i64`.
///
/// # Examples
///
/// ```
/// use lob_core::fixed::to_scaled;
///
/// assert_eq!(to_scaled("0.18394", 6).unwrap(), 183940);
/// assert_eq!(to_scaled(&0.18394_f64, 6).unwrap(), 183940);
/// ```
pub fn to_scaled<V: DecimalInput + ?Sized>(value: &V, precision: u32) -> Result<i64, ParseError> {
    if precision > MAX_PRECISION {
        return Err(ParseError::UnsupportedPrecision(precision));
    }
    let decimal = value.to_decimal()?;
    let overflow = || ParseError::Overflow {
        input: decimal.to_string(),
        precision,
    };

    let factor = Decimal::from(10i64.pow(precision));
    decimal
        .checked_mul(factor)
        .ok_or_else(overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .ok_or_else(overflow)
}

/// Convert a scaled integer back to a decimal carrying exactly `precision`
/// fractional digits (`183960` at precision 6 displays as `0.183960`).
///
/// # Panics
///
/// Panics if `precision` exceeds 28, the largest scale [`Decimal`] supports.
/// Precisions validated by [`crate::types::Precision`] never do.
pub fn to_display(scaled: i64, precision: u32) -> Decimal {
    Decimal::new(scaled, precision)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_text_to_scaled() {
        assert_eq!(to_scaled("0.18394", 6).unwrap(), 183940);
        assert_eq!(to_scaled("0.18400", 6).unwrap(), 184000);
        assert_eq!(to_scaled("3", 0).unwrap(), 3);
        assert_eq!(to_scaled(" 12.5 ", 2).unwrap(), 1250);
        assert_eq!(to_scaled("-1.25", 2).unwrap(), -125);
    }

    #[test]
    fn test_float_literal_is_exact() {
        // 0.18394 has no exact binary representation; the literal must survive.
        assert_eq!(to_scaled(&0.18394_f64, 6).unwrap(), 183940);
        assert_eq!(to_scaled(&0.1_f64, 1).unwrap(), 1);
        assert_eq!(to_scaled(&57073.4_f64, 4).unwrap(), 570734000);
    }

    #[test]
    fn test_integer_and_decimal_inputs() {
        assert_eq!(to_scaled(&7i64, 2).unwrap(), 700);
        assert_eq!(to_scaled(&7u64, 0).unwrap(), 7);
        assert_eq!(to_scaled(&dec("0.0132"), 4).unwrap(), 132);
        assert_eq!(to_scaled(&String::from("0.5"), 1).unwrap(), 5);
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(to_scaled("1e-5", 6).unwrap(), 10);
        assert_eq!(to_scaled("2.5E2", 0).unwrap(), 250);
    }

    #[test]
    fn test_rounds_half_to_even() {
        assert_eq!(to_scaled("0.125", 2).unwrap(), 12);
        assert_eq!(to_scaled("0.135", 2).unwrap(), 14);
        assert_eq!(to_scaled("0.1251", 2).unwrap(), 13);
        assert_eq!(to_scaled("2.5", 0).unwrap(), 2);
    }

    #[test]
    fn test_invalid_input() {
        for bad in ["", "abc", "1.2.3", "--1"] {
            assert!(
                matches!(to_scaled(bad, 2), Err(ParseError::InvalidNumber { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(
            to_scaled(&f64::NAN, 2),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_overflow_and_precision_limits() {
        assert!(matches!(
            to_scaled("99999999999", 9),
            Err(ParseError::Overflow { precision: 9, .. })
        ));
        assert_eq!(
            to_scaled("1", 19),
            Err(ParseError::UnsupportedPrecision(19))
        );
        assert_eq!(to_scaled("1", MAX_PRECISION).unwrap(), 10i64.pow(18));
    }

    #[test]
    fn test_display_keeps_precision_digits() {
        assert_eq!(to_display(183960, 6).to_string(), "0.183960");
        assert_eq!(to_display(3, 0).to_string(), "3");
        assert_eq!(to_display(-125, 2).to_string(), "-1.25");
    }

    #[test]
    fn test_display_inverts_scaled() {
        let cases = [
            ("0.18394", 6),
            ("0.5", 1),
            ("57073.4", 4),
            ("0.0132", 4),
            ("100", 0),
            ("0.00000001", 8),
            ("-42.42", 2),
        ];
        for (text, precision) in cases {
            let scaled = to_scaled(text, precision).unwrap();
            let expected = dec(text).round_dp(precision);
            assert_eq!(to_display(scaled, precision), expected, "{text} @ {precision}");
        }
    }

    #[test]
    fn test_display_of_rounded_input() {
        // Input finer than the precision comes back rounded.
        let scaled = to_scaled("0.183945", 5).unwrap();
        assert_eq!(to_display(scaled, 5), dec("0.18394"));
    }
}
