//! Order-level book.
//!
//! Individual resting orders are indexed by id and grouped into price
//! levels. Each level keeps its order ids in arrival order, which is the
//! time priority at that price. A level exists only while it holds at least
//! one order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use rust_decimal::Decimal;

use lob_core::types::{OrderId, Precision, Side, Symbol};
use lob_core::{DecimalInput, ScaledPrice, ScaledVolume};

use crate::error::BookError;
use crate::ladder::PriceKey;

/// One aggregated level of a [`TrackedBook`], in display precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLevel {
    pub side: Side,
    pub price: Decimal,
    /// Sum of the volumes of every order resting at this price.
    pub volume: Decimal,
    /// Resting orders, oldest first.
    pub order_ids: Vec<OrderId>,
}

/// Copy of one tracked order, in display precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOrder<S> {
    pub id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub volume: Decimal,
    pub status: S,
}

#[derive(Debug)]
struct OrderEntry<S> {
    side: Side,
    price: ScaledPrice,
    volume: ScaledVolume,
    status: S,
}

#[derive(Debug)]
struct PriceLevel {
    side: Side,
    price: ScaledPrice,
    orders: Vec<OrderId>,
}

#[derive(Debug)]
struct TrackedState<S> {
    orders: HashMap<OrderId, OrderEntry<S>>,
    bids: BTreeMap<Reverse<ScaledPrice>, PriceLevel>,
    asks: BTreeMap<ScaledPrice, PriceLevel>,
}

/// Order-level book for one symbol.
///
/// `S` is the caller's status tag for each order; the book stores it and
/// hands it back but never interprets it.
///
/// The book owns every entry; levels refer to entries by id only. All state
/// is guarded by a single [`parking_lot::Mutex`].
#[derive(Debug)]
pub struct TrackedBook<S = String> {
    symbol: Symbol,
    precision: Precision,
    state: Mutex<TrackedState<S>>,
}

impl<S> TrackedBook<S> {
    /// Create an empty book.
    pub fn new(symbol: Symbol, precision: Precision) -> Self {
        Self {
            symbol,
            precision,
            state: Mutex::new(TrackedState {
                orders: HashMap::new(),
                bids: BTreeMap::new(),
                asks: BTreeMap::new(),
            }),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Start tracking an order.
    ///
    /// Returns `Ok(false)` without touching the book if `id` is already
    /// tracked, so duplicate insert events are harmless.
    pub fn insert<P, V>(&self, id: OrderId, side: Side, price: &P, volume: &V, status: S) -> Result<bool, BookError>
    where
        P: DecimalInput + ?Sized,
        V: DecimalInput + ?Sized,
    {
        let (price, volume) = self.precision.pair_to_scaled(price, volume)?;

        let mut state = self.state.lock();
        if state.orders.contains_key(&id) {
            tracing::debug!(symbol = %self.symbol, order_id = %id, "duplicate insert ignored");
            return Ok(false);
        }

        match side {
            Side::Bid => attach(&mut state.bids, price, id),
            Side::Ask => attach(&mut state.asks, price, id),
        }
        state.orders.insert(
            id,
            OrderEntry {
                side,
                price,
                volume,
                status,
            },
        );
        Ok(true)
    }

    /// Change an order's volume in place, and its status when one is given.
    ///
    /// The order keeps its level and its position within it. Returns
    /// `Ok(false)` and logs a warning if `id` is not tracked.
    pub fn resize<V>(&self, id: OrderId, volume: &V, status: Option<S>) -> Result<bool, BookError>
    where
        V: DecimalInput + ?Sized,
    {
        let volume = self.precision.volume_to_scaled(volume)?;

        let mut state = self.state.lock();
        let Some(entry) = state.orders.get_mut(&id) else {
            tracing::warn!(symbol = %self.symbol, order_id = %id, "resize for unknown order");
            return Ok(false);
        };
        entry.volume = volume;
        if let Some(status) = status {
            entry.status = status;
        }
        Ok(true)
    }

    /// Stop tracking an order, logging a warning if it is unknown.
    pub fn cancel(&self, id: OrderId) -> bool {
        let found = self.detach(id);
        if !found {
            tracing::warn!(symbol = %self.symbol, order_id = %id, "cancel for unknown order");
        }
        found
    }

    /// Stop tracking an order. Unknown ids are ignored silently.
    pub fn remove(&self, id: OrderId) -> bool {
        self.detach(id)
    }

    fn detach(&self, id: OrderId) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.orders.remove(&id) else {
            return false;
        };
        match entry.side {
            Side::Bid => release(&mut state.bids, entry.price, id),
            Side::Ask => release(&mut state.asks, entry.price, id),
        }
        true
    }

    /// Best level of `side` with its aggregate volume and order ids, or
    /// `None` if the side is empty.
    pub fn best_of(&self, side: Side) -> Option<TrackedLevel> {
        let state = self.state.lock();
        let level = match side {
            Side::Bid => state.bids.values().next(),
            Side::Ask => state.asks.values().next(),
        }?;
        Some(self.view(&state, level))
    }

    pub fn best_bid(&self) -> Option<TrackedLevel> {
        self.best_of(Side::Bid)
    }

    pub fn best_ask(&self) -> Option<TrackedLevel> {
        self.best_of(Side::Ask)
    }

    /// Every level of `side`, best to worst.
    pub fn snapshot(&self, side: Side) -> Vec<TrackedLevel> {
        let state = self.state.lock();
        match side {
            Side::Bid => state.bids.values().map(|l| self.view(&state, l)).collect(),
            Side::Ask => state.asks.values().map(|l| self.view(&state, l)).collect(),
        }
    }

    /// Number of tracked orders on both sides.
    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    /// Number of non-empty price levels on `side`.
    pub fn level_count(&self, side: Side) -> usize {
        let state = self.state.lock();
        match side {
            Side::Bid => state.bids.len(),
            Side::Ask => state.asks.len(),
        }
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.state.lock().orders.contains_key(&id)
    }

    /// Current volume of an order in display precision.
    pub fn size_of(&self, id: OrderId) -> Option<Decimal> {
        let state = self.state.lock();
        state
            .orders
            .get(&id)
            .map(|entry| self.precision.volume_to_display(entry.volume))
    }

    fn view(&self, state: &TrackedState<S>, level: &PriceLevel) -> TrackedLevel {
        let volume = level
            .orders
            .iter()
            .filter_map(|id| state.orders.get(id))
            .fold(0i64, |acc, entry| acc.saturating_add(entry.volume));
        TrackedLevel {
            side: level.side,
            price: self.precision.price_to_display(level.price),
            volume: self.precision.volume_to_display(volume),
            order_ids: level.orders.clone(),
        }
    }
}

impl<S: Clone> TrackedBook<S> {
    /// Copy of one tracked order.
    pub fn order(&self, id: OrderId) -> Option<TrackedOrder<S>> {
        let state = self.state.lock();
        state.orders.get(&id).map(|entry| TrackedOrder {
            id,
            side: entry.side,
            price: self.precision.price_to_display(entry.price),
            volume: self.precision.volume_to_display(entry.volume),
            status: entry.status.clone(),
        })
    }
}

/// Append `id` to the level at `price`, creating the level if needed.
fn attach<K: PriceKey>(levels: &mut BTreeMap<K, PriceLevel>, price: ScaledPrice, id: OrderId) {
    levels
        .entry(K::from_price(price))
        .or_insert_with(|| PriceLevel {
            side: K::SIDE,
            price,
            orders: Vec::new(),
        })
        .orders
        .push(id);
}

/// Remove `id` from the level at `price`, dropping the level once empty.
fn release<K: PriceKey>(levels: &mut BTreeMap<K, PriceLevel>, price: ScaledPrice, id: OrderId) {
    let key = K::from_price(price);
    let Some(level) = levels.get_mut(&key) else {
        return;
    };
    if let Some(pos) = level.orders.iter().position(|o| *o == id) {
        level.orders.remove(pos);
    }
    if level.orders.is_empty() {
        levels.remove(&key);
    }
}
