//! Safety monitoring
//!
//! Tracks output stage faults and decides whether the coil may be energized.

pub mod monitor;

pub use monitor::{FaultKind, SafetyMonitor, SafetyStatus};
