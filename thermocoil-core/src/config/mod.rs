//! Configuration types
//!
//! Board-agnostic configuration structures. Every `Default` reproduces the
//! tuning of the Presa TC75W firmware; hosts may deserialize overrides with
//! the `serde` feature.

pub mod limits;
pub mod tuning;
pub mod types;

pub use limits::*;
pub use tuning::*;
pub use types::*;
