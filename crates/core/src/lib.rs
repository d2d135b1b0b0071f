//! # lob-core
//!
//! Shared building blocks for the lob workspace: the fixed-point codec that
//! turns decimal text into scaled integers, identifier and side types,
//! layered configuration, and the tracing setup.

pub mod config;
pub mod fixed;
pub mod logging;
pub mod types;

pub use fixed::{to_display, to_scaled, DecimalInput, ParseError, ScaledPrice, ScaledVolume};
