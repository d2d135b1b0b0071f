//! # lob-book
//!
//! In-memory replicas of an exchange limit order book.
//!
//! - [`PriceLevelBook`] aggregates volume per price and answers best-price,
//!   top-N and depth-walk queries. It encodes to and decodes from a compact
//!   single-line text snapshot.
//! - [`TrackedBook`] keeps individual resting orders grouped into price
//!   levels, keyed by the caller's order id.
//!
//! Both books hold prices and volumes as scaled integers (see
//! [`lob_core::fixed`]) and guard their state with a single mutex, so every
//! method takes `&self` and no reader ever observes a half-applied batch.
//!
//! # Example
//!
//! ```rust
//! use lob_book::PriceLevelBook;
//! use lob_core::types::{Precision, Side};
//!
//! let book = PriceLevelBook::new(Precision::new(6, 0).unwrap());
//! book.reset(Side::Bid, &[("0.18394", "1"), ("0.18396", "3")], Some(1)).unwrap();
//! book.reset(Side::Ask, &[("0.18400", "4")], None).unwrap();
//!
//! let best = book.best_bid().unwrap();
//! assert_eq!(best.price.to_string(), "0.183960");
//! assert_eq!(book.encode(5), "1,BID,2,0.183960|3;0.183940|1,ASK,1,0.184000|4");
//! ```

mod aggregated;
mod compact;
mod error;
mod ladder;
mod tracked;

pub use aggregated::{DepthHit, PriceLevelBook, SequencePolicy};
pub use error::BookError;
pub use tracked::{TrackedBook, TrackedLevel, TrackedOrder};
