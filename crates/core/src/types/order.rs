//! Identifier types: book side, order id and symbol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Book side.
///
/// The best BID is the highest price; the best ASK is the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy interest.
    Bid,
    /// Sell interest.
    Ask,
}

impl Side {
    /// The side an order on `self` trades against.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Returns `true` if `a` is a strictly better price than `b` on this side.
    #[inline]
    pub fn is_better(self, a: i64, b: i64) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// Error returned when a side name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown side: {0:?}")]
pub struct UnknownSide(pub String);

impl FromStr for Side {
    type Err = UnknownSide;

    /// Accepts `BID`/`ASK` and the order-flow spellings `BUY`/`SELL`,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BID" | "BUY" => Ok(Side::Bid),
            "ASK" | "SELL" => Ok(Side::Ask),
            _ => Err(UnknownSide(s.to_string())),
        }
    }
}

/// Caller-supplied order identifier, unique within a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Trading pair symbol (e.g. "ETHBTC").
///
/// Symbols are normalised to upper case so that `ethbtc` from a channel
/// name and `ETHBTC` from configuration address the same book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a new symbol.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_ascii_uppercase())
    }

    /// The normalised symbol text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", Side::Bid), "BID");
        assert_eq!(format!("{}", Side::Ask), "ASK");
    }

    #[test]
    fn test_side_from_str() {
        assert_eq!("BID".parse::<Side>().unwrap(), Side::Bid);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Ask);
        assert_eq!("Buy".parse::<Side>().unwrap(), Side::Bid);
        assert!("mid".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }

    #[test]
    fn test_side_is_better() {
        assert!(Side::Bid.is_better(101, 100));
        assert!(!Side::Bid.is_better(100, 100));
        assert!(Side::Ask.is_better(100, 101));
        assert!(!Side::Ask.is_better(101, 100));
    }

    #[test]
    fn test_order_id_display() {
        assert_eq!(format!("{}", OrderId(147120366257471488)), "147120366257471488");
        assert_eq!(OrderId::from(7), OrderId(7));
    }

    #[test]
    fn test_symbol_normalised() {
        let s = Symbol::new("ethbtc");
        assert_eq!(s.as_str(), "ETHBTC");
        assert_eq!(s, Symbol::from("ETHBTC"));
        assert_eq!(format!("{}", s), "ETHBTC");
    }
}
