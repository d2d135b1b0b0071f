//! Compact single-line snapshot text.
//!
//! ```text
//! <sequence>,BID,<bidCount>,<p>|<v>;<p>|<v>;...,ASK,<askCount>,<p>|<v>;...
//! ```
//!
//! Fields are positional: the sequence is field 0, the bid payload field 3
//! and the ask payload field 6. Prices and volumes are written at the book's
//! display precision.

use std::fmt::Write as _;

use lob_core::types::{Precision, Side};
use lob_core::{ScaledPrice, ScaledVolume};

use crate::aggregated::PriceLevelBook;
use crate::error::BookError;

const FIELD_COUNT: usize = 7;
const LEVEL_SEPARATOR: char = ';';
const PAIR_SEPARATOR: char = '|';

impl PriceLevelBook {
    /// Encode the sequence and the top `n` levels of both sides.
    ///
    /// Both sides are read under one lock, so the text is a consistent
    /// snapshot.
    pub fn encode(&self, n: usize) -> String {
        let (sequence, bids, asks) = self.top_scaled(n);
        let precision = self.precision();

        let mut out = String::with_capacity(32 + 24 * (bids.len() + asks.len()));
        let _ = write!(out, "{sequence}");
        write_side(&mut out, Side::Bid, &bids, precision);
        write_side(&mut out, Side::Ask, &asks, precision);
        out
    }

    /// Parse text produced by [`PriceLevelBook::encode`].
    ///
    /// Only the encoded levels are recovered. Any structural defect fails
    /// the whole decode; a partially populated book is never returned.
    pub fn decode(text: &str, precision: Precision) -> Result<Self, BookError> {
        let fields: Vec<&str> = text.trim().split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(BookError::FieldCount { found: fields.len() });
        }

        let sequence: u64 = fields[0]
            .trim()
            .parse()
            .map_err(|_| BookError::malformed(format!("invalid sequence {:?}", fields[0])))?;

        let bids = parse_side(Side::Bid, fields[1], fields[2], fields[3], precision)?;
        let asks = parse_side(Side::Ask, fields[4], fields[5], fields[6], precision)?;

        Ok(Self::from_scaled(sequence, &bids, &asks, precision))
    }
}

fn write_side(out: &mut String, side: Side, levels: &[(ScaledPrice, ScaledVolume)], precision: Precision) {
    let _ = write!(out, ",{side},{},", levels.len());
    for (i, &(price, volume)) in levels.iter().enumerate() {
        if i > 0 {
            out.push(LEVEL_SEPARATOR);
        }
        let _ = write!(
            out,
            "{}{PAIR_SEPARATOR}{}",
            precision.price_to_display(price),
            precision.volume_to_display(volume)
        );
    }
}

fn parse_side(
    side: Side,
    label: &str,
    count: &str,
    payload: &str,
    precision: Precision,
) -> Result<Vec<(ScaledPrice, ScaledVolume)>, BookError> {
    let label = label.trim();
    if label != side.to_string() {
        return Err(BookError::malformed(format!(
            "expected {side} marker, found {label:?}"
        )));
    }

    let count: usize = count
        .trim()
        .parse()
        .map_err(|_| BookError::malformed(format!("invalid {side} count {count:?}")))?;

    let payload = payload.trim();
    let levels = if payload.is_empty() {
        Vec::new()
    } else {
        payload
            .split(LEVEL_SEPARATOR)
            .map(|pair| parse_pair(pair, precision))
            .collect::<Result<Vec<_>, _>>()?
    };

    if levels.len() != count {
        return Err(BookError::malformed(format!(
            "{side} declares {count} levels but carries {}",
            levels.len()
        )));
    }
    Ok(levels)
}

fn parse_pair(pair: &str, precision: Precision) -> Result<(ScaledPrice, ScaledVolume), BookError> {
    let mut parts = pair.split(PAIR_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(price), Some(volume), None) => Ok(precision.pair_to_scaled(price, volume)?),
        _ => Err(BookError::malformed(format!("invalid level {pair:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn precision() -> Precision {
        Precision::new(6, 0).unwrap()
    }

    fn make_book() -> PriceLevelBook {
        PriceLevelBook::from_levels(
            42,
            &[("0.18394", "1"), ("0.18395", "2"), ("0.18396", "3")],
            &[("0.18400", "4"), ("0.18401", "3")],
            precision(),
        )
        .unwrap()
    }

    #[test]
    fn test_encode_format() {
        let book = make_book();
        assert_eq!(
            book.encode(5),
            "42,BID,3,0.183960|3;0.183950|2;0.183940|1,ASK,2,0.184000|4;0.184010|3"
        );
        assert_eq!(book.encode(1), "42,BID,1,0.183960|3,ASK,1,0.184000|4");
    }

    #[test]
    fn test_encode_empty_sides() {
        let book = PriceLevelBook::new(precision());
        assert_eq!(book.encode(5), "0,BID,0,,ASK,0,");

        let decoded = PriceLevelBook::decode("0,BID,0,,ASK,0,", precision()).unwrap();
        assert!(decoded.is_empty(Side::Bid));
        assert!(decoded.is_empty(Side::Ask));
    }

    #[test]
    fn test_decode_restores_top_levels() {
        let book = make_book();
        let decoded = PriceLevelBook::decode(&book.encode(5), precision()).unwrap();

        assert_eq!(decoded.sequence(), 42);
        for side in [Side::Bid, Side::Ask] {
            assert_eq!(decoded.snapshot_top(side, 5), book.snapshot_top(side, 5));
        }
    }

    #[test]
    fn test_decode_is_bounded_by_encoded_depth() {
        let book = make_book();
        let decoded = PriceLevelBook::decode(&book.encode(2), precision()).unwrap();
        assert_eq!(decoded.level_count(Side::Bid), 2);
        assert_eq!(decoded.best_bid(), book.best_bid());
        assert_eq!(decoded.volume_at(Side::Bid, dec!(0.18394)).unwrap(), None);
    }

    #[test]
    fn test_decode_with_volume_precision() {
        let precision = Precision::new(2, 4).unwrap();
        let book = PriceLevelBook::decode("7,BID,1,57073.40|0.0132,ASK,1,57073.50|1.5", precision).unwrap();
        assert_eq!(book.best_bid().unwrap().volume, dec!(0.0132));
        assert_eq!(book.best_ask().unwrap().price, dec!(57073.5));
        assert_eq!(book.encode(1), "7,BID,1,57073.40|0.0132,ASK,1,57073.50|1.5000");
    }

    #[test]
    fn test_decode_rejects_short_input() {
        let err = PriceLevelBook::decode("1,BID,1,0.1|1,ASK,0", precision()).unwrap_err();
        assert!(matches!(err, BookError::FieldCount { found: 6 }));

        let err = PriceLevelBook::decode("", precision()).unwrap_err();
        assert!(matches!(err, BookError::FieldCount { found: 1 }));
    }

    #[test]
    fn test_decode_rejects_structural_defects() {
        let cases = [
            "x,BID,0,,ASK,0,",
            "1,BUY,0,,ASK,0,",
            "1,BID,0,,BID,0,",
            "1,BID,2,0.1|1,ASK,0,",
            "1,BID,one,0.1|1,ASK,0,",
            "1,BID,1,0.1,ASK,0,",
            "1,BID,1,0.1|1|2,ASK,0,",
        ];
        for text in cases {
            let err = PriceLevelBook::decode(text, precision()).unwrap_err();
            assert!(
                matches!(err, BookError::MalformedSnapshot { .. }),
                "{text:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_bad_numbers() {
        let err = PriceLevelBook::decode("1,BID,1,abc|1,ASK,0,", precision()).unwrap_err();
        assert!(matches!(err, BookError::Parse(_)));
    }
}
