//! Routes order-level events to per-symbol tracked books.

use std::sync::Arc;

use dashmap::DashMap;

use lob_book::TrackedBook;
use lob_core::types::{Precision, Symbol};

use crate::error::DepthError;
use crate::events::OrderEvent;

/// Registry of [`TrackedBook`]s keyed by symbol.
#[derive(Default)]
pub struct OrderBookRouter {
    books: DashMap<Symbol, Arc<TrackedBook>>,
}

impl OrderBookRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `symbol`, or return its existing book.
    pub fn track(&self, symbol: Symbol, precision: Precision) -> Arc<TrackedBook> {
        let entry = self
            .books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(TrackedBook::new(symbol, precision)));
        Arc::clone(entry.value())
    }

    /// Stop tracking `symbol`, dropping every order in its book.
    pub fn untrack(&self, symbol: &Symbol) -> bool {
        self.books.remove(symbol).is_some()
    }

    pub fn book(&self, symbol: &Symbol) -> Option<Arc<TrackedBook>> {
        self.books.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    /// Apply one event to the book of `symbol`.
    ///
    /// Returns whether the event changed the book: `false` for a duplicate
    /// insert or an unknown order id.
    pub fn apply(&self, symbol: &Symbol, event: OrderEvent) -> Result<bool, DepthError> {
        let book = self
            .book(symbol)
            .ok_or_else(|| DepthError::UnknownSymbol(symbol.clone()))?;

        let changed = match event {
            OrderEvent::Insert {
                id,
                side,
                price,
                volume,
                status,
            } => book.insert(id, side, price.as_str(), volume.as_str(), status)?,
            OrderEvent::Resize { id, volume, status } => book.resize(id, volume.as_str(), status)?,
            OrderEvent::Cancel { id } => book.cancel(id),
        };
        Ok(changed)
    }
}
