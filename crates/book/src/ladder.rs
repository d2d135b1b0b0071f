//! Side-ordered price ladders.
//!
//! Bids are keyed by `Reverse<i64>` and asks by `i64`, so iterating either
//! [`BTreeMap`] yields the best price first and "at or better than" is
//! always `key <= K::from_price(p)`.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use lob_core::types::Side;
use lob_core::{ScaledPrice, ScaledVolume};

/// Map key supplying the comparison direction of one side.
pub(crate) trait PriceKey: Ord + Copy {
    /// The side this ordering belongs to.
    const SIDE: Side;

    fn from_price(price: ScaledPrice) -> Self;

    fn price(self) -> ScaledPrice;
}

/// Ask ordering: ascending price, lowest first.
impl PriceKey for ScaledPrice {
    const SIDE: Side = Side::Ask;

    #[inline]
    fn from_price(price: ScaledPrice) -> Self {
        price
    }

    #[inline]
    fn price(self) -> ScaledPrice {
        self
    }
}

/// Bid ordering: descending price, highest first.
impl PriceKey for Reverse<ScaledPrice> {
    const SIDE: Side = Side::Bid;

    #[inline]
    fn from_price(price: ScaledPrice) -> Self {
        Reverse(price)
    }

    #[inline]
    fn price(self) -> ScaledPrice {
        self.0
    }
}

/// One side of an aggregated book: price -> strictly positive volume.
#[derive(Debug)]
pub(crate) struct Ladder<K> {
    levels: BTreeMap<K, ScaledVolume>,
}

impl<K: PriceKey> Ladder<K> {
    pub(crate) fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.levels.clear();
    }

    /// Insert or overwrite the aggregate at `price`; a non-positive volume
    /// removes the level instead.
    pub(crate) fn upsert(&mut self, price: ScaledPrice, volume: ScaledVolume) {
        if volume > 0 {
            self.levels.insert(K::from_price(price), volume);
        } else {
            self.levels.remove(&K::from_price(price));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub(crate) fn get(&self, price: ScaledPrice) -> Option<ScaledVolume> {
        self.levels.get(&K::from_price(price)).copied()
    }

    pub(crate) fn best(&self) -> Option<(ScaledPrice, ScaledVolume)> {
        self.iter().next()
    }

    /// Levels from best to worst.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ScaledPrice, ScaledVolume)> + '_ {
        self.levels.iter().map(|(k, v)| (k.price(), *v))
    }

    /// Number of levels priced at or better than `price`.
    ///
    /// O(k) in the returned count: `BTreeMap` has no positional index.
    pub(crate) fn rank(&self, price: ScaledPrice) -> usize {
        self.levels.range(..=K::from_price(price)).count()
    }

    /// Walk from the best level outward until the cumulative volume reaches
    /// `target`. Levels priced worse than `limit` end the walk.
    ///
    /// Returns `(index_from_best, price, cumulative_volume)`.
    pub(crate) fn walk(
        &self,
        target: ScaledVolume,
        limit: Option<ScaledPrice>,
    ) -> Option<(usize, ScaledPrice, ScaledVolume)> {
        let mut cumulative: ScaledVolume = 0;
        for (index, (price, volume)) in self.iter().enumerate() {
            if let Some(limit) = limit {
                if K::from_price(price) > K::from_price(limit) {
                    return None;
                }
            }
            cumulative = cumulative.saturating_add(volume);
            if cumulative >= target {
                return Some((index, price, cumulative));
            }
        }
        None
    }
}
