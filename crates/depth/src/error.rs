//! Depth cache error types.

use lob_book::BookError;
use lob_core::types::Symbol;

/// Errors raised by the depth cache manager and the order-event router.
#[derive(Debug, thiserror::Error)]
pub enum DepthError {
    /// No book is registered for the symbol.
    #[error("symbol {0} is not subscribed")]
    UnknownSymbol(Symbol),

    /// The manager has been closed.
    #[error("depth cache manager is closed")]
    Closed,

    /// The book rejected an update.
    #[error(transparent)]
    Book(#[from] BookError),

    /// The snapshot source failed.
    #[error("snapshot fetch for {symbol} failed")]
    Snapshot {
        symbol: Symbol,
        #[source]
        source: anyhow::Error,
    },

    /// A snapshot fetch for the symbol is already in flight.
    #[error("snapshot refresh for {0} already in progress")]
    RefreshInProgress(Symbol),

    /// A wire message could not be deserialized.
    #[error("invalid message: {0}")]
    Decode(#[from] serde_json::Error),

    /// A depth channel name does not carry a symbol.
    #[error("unrecognised depth channel {0:?}")]
    Channel(String),
}
