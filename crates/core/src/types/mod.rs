//! Core types shared by the book and depth crates.
//!
//! Display-facing values are [`rust_decimal::Decimal`]; everything stored in a
//! book is a scaled integer produced by [`crate::fixed`].

pub mod market_data;
pub mod order;

// Re-export primary types for convenient access via `lob_core::types::*`.
pub use market_data::{BookLevel, Precision};
pub use order::{OrderId, Side, Symbol};
