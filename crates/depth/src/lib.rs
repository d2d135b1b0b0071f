//! # lob-depth
//!
//! Keeps per-symbol [`lob_book::PriceLevelBook`]s in sync with an exchange
//! and routes order-level events to [`lob_book::TrackedBook`]s.
//!
//! - [`DepthCacheManager`] buffers depth events until a snapshot arrives,
//!   replays the newer ones on top of it and refreshes the snapshot
//!   periodically.
//! - [`SnapshotSource`] is the seam for the REST client that fetches
//!   snapshots.
//! - [`DepthMessage`] parses the exchange's JSON depth push into a
//!   [`DepthEvent`].
//! - [`OrderBookRouter`] applies [`OrderEvent`]s to tracked books.
//! - [`spawn_writer`] runs the single writer thread fed by a crossbeam
//!   channel.

pub mod error;
pub mod events;
pub mod manager;
pub mod router;

pub use error::DepthError;
pub use events::{DepthEvent, DepthMessage, DepthSnapshot, DepthTick, Level, OrderEvent};
pub use manager::{spawn_writer, DepthCacheManager, DepthListener, Outcome, RefreshReport, SnapshotSource};
pub use router::OrderBookRouter;
