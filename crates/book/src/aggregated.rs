//! Aggregated (price level) order book.
//!
//! The book receives full snapshots and incremental delta batches from an
//! exchange feed and maintains a consistent view of market depth. Bids are
//! stored with [`std::cmp::Reverse`] keys so that iteration yields prices in
//! descending order (highest bid first). Asks use natural ordering (lowest
//! ask first).

use std::cmp::Reverse;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use lob_core::types::{BookLevel, Precision, Side};
use lob_core::{DecimalInput, ParseError, ScaledPrice, ScaledVolume};

use crate::error::BookError;
use crate::ladder::Ladder;

/// How [`PriceLevelBook::apply_delta`] treats a batch sequence that does not
/// advance past the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequencePolicy {
    /// Apply the batch and overwrite the stored sequence unconditionally.
    /// Ordering is the upstream feed's responsibility.
    #[default]
    Permissive,
    /// Reject the batch with [`BookError::OutOfOrder`] and leave the book
    /// untouched.
    Strict,
}

/// Result of a depth walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthHit {
    /// Position of the satisfying level, `0` being the best level of the
    /// walked side (lowest ask, highest bid).
    pub level: usize,
    /// Price of the satisfying level.
    pub price: Decimal,
    /// Volume accumulated from the best level through this one.
    pub cumulative: Decimal,
}

#[derive(Debug)]
struct BookState {
    sequence: u64,
    bids: Ladder<Reverse<ScaledPrice>>,
    asks: Ladder<ScaledPrice>,
}

/// Price-aggregated book for one symbol.
///
/// Invariant: a price is present on a side iff its aggregate volume is
/// strictly positive.
///
/// All state sits behind one [`parking_lot::Mutex`]. Mutators parse their
/// whole batch before taking the lock, then apply it in one critical
/// section, so readers see either the previous or the new state.
#[derive(Debug)]
pub struct PriceLevelBook {
    precision: Precision,
    policy: SequencePolicy,
    state: Mutex<BookState>,
}

impl PriceLevelBook {
    /// Create an empty book with sequence `0` and permissive sequencing.
    pub fn new(precision: Precision) -> Self {
        Self::with_policy(precision, SequencePolicy::Permissive)
    }

    /// Create an empty book with the given sequencing policy.
    pub fn with_policy(precision: Precision, policy: SequencePolicy) -> Self {
        Self {
            precision,
            policy,
            state: Mutex::new(BookState {
                sequence: 0,
                bids: Ladder::new(),
                asks: Ladder::new(),
            }),
        }
    }

    /// Create a book populated from initial bid and ask pairs.
    pub fn from_levels<P, V>(
        sequence: u64,
        bids: &[(P, V)],
        asks: &[(P, V)],
        precision: Precision,
    ) -> Result<Self, BookError>
    where
        P: DecimalInput,
        V: DecimalInput,
    {
        let book = Self::new(precision);
        book.apply_snapshot(bids, asks, sequence)?;
        Ok(book)
    }

    /// Build a book directly from scaled levels.
    pub(crate) fn from_scaled(
        sequence: u64,
        bids: &[(ScaledPrice, ScaledVolume)],
        asks: &[(ScaledPrice, ScaledVolume)],
        precision: Precision,
    ) -> Self {
        let book = Self::new(precision);
        {
            let mut state = book.state.lock();
            state.sequence = sequence;
            for &(price, volume) in bids {
                state.bids.upsert(price, volume);
            }
            for &(price, volume) in asks {
                state.asks.upsert(price, volume);
            }
        }
        book
    }

    /// Price and volume precision of this book.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Sequencing policy of this book.
    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Sequence of the last applied snapshot or batch.
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    /// Replace one side with the given `(price, volume)` pairs.
    ///
    /// Used to apply a full snapshot. When `sequence` is `Some`, it replaces
    /// the stored sequence unconditionally, even if older; discarding stale
    /// snapshots is the caller's job. Pairs with zero volume are skipped.
    pub fn reset<P, V>(&self, side: Side, pairs: &[(P, V)], sequence: Option<u64>) -> Result<(), BookError>
    where
        P: DecimalInput,
        V: DecimalInput,
    {
        let levels = self.scale_pairs(pairs)?;

        let mut state = self.state.lock();
        match side {
            Side::Bid => {
                state.bids.clear();
                for (price, volume) in levels {
                    state.bids.upsert(price, volume);
                }
            }
            Side::Ask => {
                state.asks.clear();
                for (price, volume) in levels {
                    state.asks.upsert(price, volume);
                }
            }
        }
        if let Some(sequence) = sequence {
            state.sequence = sequence;
        }
        Ok(())
    }

    /// Replace both sides from a full snapshot in one critical section.
    ///
    /// Like [`PriceLevelBook::reset`], the sequence is overwritten even if
    /// it is older than the current one.
    pub fn apply_snapshot<P, V>(&self, bids: &[(P, V)], asks: &[(P, V)], sequence: u64) -> Result<(), BookError>
    where
        P: DecimalInput,
        V: DecimalInput,
    {
        let bids = self.scale_pairs(bids)?;
        let asks = self.scale_pairs(asks)?;

        let mut state = self.state.lock();
        state.bids.clear();
        state.asks.clear();
        for (price, volume) in bids {
            state.bids.upsert(price, volume);
        }
        for (price, volume) in asks {
            state.asks.upsert(price, volume);
        }
        state.sequence = sequence;
        Ok(())
    }

    /// Apply bid and ask deltas that share one sequence, atomically.
    ///
    /// Same per-pair rules and sequencing policy as
    /// [`PriceLevelBook::apply_delta`]; the sequence is checked once for the
    /// whole update.
    pub fn apply_update<P, V>(&self, bids: &[(P, V)], asks: &[(P, V)], sequence: u64) -> Result<(), BookError>
    where
        P: DecimalInput,
        V: DecimalInput,
    {
        let bids = self.scale_pairs(bids)?;
        let asks = self.scale_pairs(asks)?;

        let mut state = self.state.lock();
        self.check_sequence(state.sequence, sequence)?;
        for (price, volume) in bids {
            state.bids.upsert(price, volume);
        }
        for (price, volume) in asks {
            state.asks.upsert(price, volume);
        }
        state.sequence = sequence;
        Ok(())
    }

    /// Apply an incremental batch to one side.
    ///
    /// - A positive volume inserts or overwrites the aggregate at that price.
    /// - A zero volume removes the price (no-op if absent).
    /// - The stored sequence becomes `sequence`. Under
    ///   [`SequencePolicy::Strict`] a sequence that does not advance is
    ///   rejected and nothing is applied.
    pub fn apply_delta<P, V>(&self, side: Side, pairs: &[(P, V)], sequence: u64) -> Result<(), BookError>
    where
        P: DecimalInput,
        V: DecimalInput,
    {
        let levels = self.scale_pairs(pairs)?;

        let mut state = self.state.lock();
        self.check_sequence(state.sequence, sequence)?;

        match side {
            Side::Bid => {
                for (price, volume) in levels {
                    state.bids.upsert(price, volume);
                }
            }
            Side::Ask => {
                for (price, volume) in levels {
                    state.asks.upsert(price, volume);
                }
            }
        }
        state.sequence = sequence;
        Ok(())
    }

    /// Remove every level on both sides. The sequence is kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.bids.clear();
        state.asks.clear();
    }

    /// Best level of `side` (highest bid, lowest ask), or `None` if the side
    /// has no liquidity.
    pub fn best_of(&self, side: Side) -> Option<BookLevel> {
        self.best_price_volume(side)
            .map(|(price, volume)| BookLevel::from_scaled(price, volume, self.precision))
    }

    /// Returns the highest bid level, if any.
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.best_of(Side::Bid)
    }

    /// Returns the lowest ask level, if any.
    pub fn best_ask(&self) -> Option<BookLevel> {
        self.best_of(Side::Ask)
    }

    /// Scaled best price of `side`.
    pub fn best_price(&self, side: Side) -> Option<ScaledPrice> {
        self.best_price_volume(side).map(|(price, _)| price)
    }

    fn best_price_volume(&self, side: Side) -> Option<(ScaledPrice, ScaledVolume)> {
        let state = self.state.lock();
        match side {
            Side::Bid => state.bids.best(),
            Side::Ask => state.asks.best(),
        }
    }

    /// How deep an order on `side` must walk the opposite side to fill
    /// `target * multiplier` without trading through `limit`.
    ///
    /// A BID walks the asks from the lowest price up; an ASK walks the bids
    /// from the highest price down. Returns the first level at which the
    /// cumulative volume reaches the target while the level price is at or
    /// better than `limit`, or `None` if the walked side runs out first.
    /// This estimates a theoretical fill; nothing is executed.
    pub fn depth_for(
        &self,
        side: Side,
        target: Decimal,
        limit: Option<Decimal>,
        multiplier: u32,
    ) -> Result<Option<DepthHit>, BookError> {
        let target = self.precision.volume_to_scaled(&target)?;
        let target = target
            .checked_mul(i64::from(multiplier))
            .ok_or_else(|| ParseError::Overflow {
                input: format!("{target} x {multiplier}"),
                precision: self.precision.volume(),
            })?;
        let limit = limit
            .map(|price| self.precision.price_to_scaled(&price))
            .transpose()?;

        let state = self.state.lock();
        let hit = match side.opposite() {
            Side::Bid => state.bids.walk(target, limit),
            Side::Ask => state.asks.walk(target, limit),
        };
        drop(state);

        Ok(hit.map(|(level, price, cumulative)| DepthHit {
            level,
            price: self.precision.price_to_display(price),
            cumulative: self.precision.volume_to_display(cumulative),
        }))
    }

    /// Number of price levels on `side`.
    pub fn level_count(&self, side: Side) -> usize {
        let state = self.state.lock();
        match side {
            Side::Bid => state.bids.len(),
            Side::Ask => state.asks.len(),
        }
    }

    /// Returns `true` if `side` has no levels.
    pub fn is_empty(&self, side: Side) -> bool {
        let state = self.state.lock();
        match side {
            Side::Bid => state.bids.is_empty(),
            Side::Ask => state.asks.is_empty(),
        }
    }

    /// Number of levels on `side` priced at or better than `price`: bids at
    /// or above it, asks at or below it.
    pub fn rank_of(&self, side: Side, price: Decimal) -> Result<usize, BookError> {
        let price = self.precision.price_to_scaled(&price)?;
        let state = self.state.lock();
        Ok(match side {
            Side::Bid => state.bids.rank(price),
            Side::Ask => state.asks.rank(price),
        })
    }

    /// Aggregate volume resting at exactly `price`.
    pub fn volume_at(&self, side: Side, price: Decimal) -> Result<Option<Decimal>, BookError> {
        let price = self.precision.price_to_scaled(&price)?;
        let state = self.state.lock();
        let volume = match side {
            Side::Bid => state.bids.get(price),
            Side::Ask => state.asks.get(price),
        };
        Ok(volume.map(|v| self.precision.volume_to_display(v)))
    }

    /// Up to `n` levels of `side`, best to worst, in display precision.
    pub fn snapshot_top(&self, side: Side, n: usize) -> Vec<BookLevel> {
        let state = self.state.lock();
        let levels: Vec<(ScaledPrice, ScaledVolume)> = match side {
            Side::Bid => state.bids.iter().take(n).collect(),
            Side::Ask => state.asks.iter().take(n).collect(),
        };
        drop(state);

        levels
            .into_iter()
            .map(|(price, volume)| BookLevel::from_scaled(price, volume, self.precision))
            .collect()
    }

    /// Sequence plus the top `n` scaled levels of both sides, read under a
    /// single lock.
    pub(crate) fn top_scaled(&self, n: usize) -> (u64, Vec<(ScaledPrice, ScaledVolume)>, Vec<(ScaledPrice, ScaledVolume)>) {
        let state = self.state.lock();
        (
            state.sequence,
            state.bids.iter().take(n).collect(),
            state.asks.iter().take(n).collect(),
        )
    }

    /// Returns the mid-price: (best_bid + best_ask) / 2.
    ///
    /// Returns `None` if either side of the book is empty.
    pub fn mid_price(&self) -> Option<Decimal> {
        let (bid, ask) = self.touch()?;
        Some((bid.price + ask.price) / Decimal::TWO)
    }

    /// Returns the spread: best_ask - best_bid.
    ///
    /// Returns `None` if either side of the book is empty.
    pub fn spread(&self) -> Option<Decimal> {
        let (bid, ask) = self.touch()?;
        Some(ask.price - bid.price)
    }

    /// Returns `true` if the book is crossed (best_bid >= best_ask).
    pub fn is_crossed(&self) -> bool {
        self.touch()
            .map(|(bid, ask)| bid.price >= ask.price)
            .unwrap_or(false)
    }

    /// Best bid and best ask read under one lock.
    fn touch(&self) -> Option<(BookLevel, BookLevel)> {
        let state = self.state.lock();
        let (bid_price, bid_volume) = state.bids.best()?;
        let (ask_price, ask_volume) = state.asks.best()?;
        drop(state);
        Some((
            BookLevel::from_scaled(bid_price, bid_volume, self.precision),
            BookLevel::from_scaled(ask_price, ask_volume, self.precision),
        ))
    }

    fn check_sequence(&self, current: u64, received: u64) -> Result<(), BookError> {
        if self.policy == SequencePolicy::Strict && received <= current {
            tracing::debug!(received, current, "rejecting out-of-order delta batch");
            return Err(BookError::OutOfOrder { current, received });
        }
        Ok(())
    }

    fn scale_pairs<P, V>(&self, pairs: &[(P, V)]) -> Result<Vec<(ScaledPrice, ScaledVolume)>, ParseError>
    where
        P: DecimalInput,
        V: DecimalInput,
    {
        pairs
            .iter()
            .map(|(price, volume)| self.precision.pair_to_scaled(price, volume))
            .collect()
    }
}
