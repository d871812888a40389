//! Output voltage computation
//!
//! Turns a power command into a voltage command and keeps that command
//! inside the output stage limits.

pub mod mapper;
pub mod slew;

pub use mapper::{implied_current_ma, implied_power_mw, volts_for_power, VOLTS_STEP_MV};
pub use slew::{LimitContext, LimitFlags, LimitOutcome, SlewLimiter};
