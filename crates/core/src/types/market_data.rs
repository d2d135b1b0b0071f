//! Display-facing market data types and per-symbol precision.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::fixed::{self, DecimalInput, ParseError, ScaledPrice, ScaledVolume, MAX_PRECISION};

/// A single aggregated price level in display precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Aggregate volume at this level.
    pub volume: Decimal,
}

impl BookLevel {
    /// Build a display level from scaled integers.
    pub fn from_scaled(price: ScaledPrice, volume: ScaledVolume, precision: Precision) -> Self {
        Self {
            price: precision.price_to_display(price),
            volume: precision.volume_to_display(volume),
        }
    }
}

/// Number of decimal places used for prices and volumes of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Precision {
    price: u32,
    volume: u32,
}

impl Precision {
    /// Create a precision pair. Both values must be at most
    /// [`MAX_PRECISION`].
    pub fn new(price: u32, volume: u32) -> Result<Self, ParseError> {
        for p in [price, volume] {
            if p > MAX_PRECISION {
                return Err(ParseError::UnsupportedPrecision(p));
            }
        }
        Ok(Self { price, volume })
    }

    /// Price decimal places.
    #[inline]
    pub const fn price(&self) -> u32 {
        self.price
    }

    /// Volume decimal places.
    #[inline]
    pub const fn volume(&self) -> u32 {
        self.volume
    }

    /// Scale a price.
    pub fn price_to_scaled<V: DecimalInput + ?Sized>(&self, value: &V) -> Result<ScaledPrice, ParseError> {
        fixed::to_scaled(value, self.price)
    }

    /// Scale a volume.
    pub fn volume_to_scaled<V: DecimalInput + ?Sized>(&self, value: &V) -> Result<ScaledVolume, ParseError> {
        fixed::to_scaled(value, self.volume)
    }

    /// Scale a `(price, volume)` pair.
    pub fn pair_to_scaled<P, V>(&self, price: &P, volume: &V) -> Result<(ScaledPrice, ScaledVolume), ParseError>
    where
        P: DecimalInput + ?Sized,
        V: DecimalInput + ?Sized,
    {
        Ok((self.price_to_scaled(price)?, self.volume_to_scaled(volume)?))
    }

    /// Render a scaled price at display precision.
    #[inline]
    pub fn price_to_display(&self, scaled: ScaledPrice) -> Decimal {
        fixed::to_display(scaled, self.price)
    }

    /// Render a scaled volume at display precision.
    #[inline]
    pub fn volume_to_display(&self, scaled: ScaledVolume) -> Decimal {
        fixed::to_display(scaled, self.volume)
    }
}
