//! Board-agnostic regulation engine for atomizer temperature control
//!
//! This crate contains all control logic that does not depend on specific
//! hardware:
//!
//! - Collaborator traits (measurement, output stage, buttons, clock)
//! - Resistance-to-temperature estimation
//! - Power regulators (proportional-integral and threshold ramp)
//! - Voltage mapping and slew limiting
//! - Mode controller sequencing one control tick
//! - Safety bookkeeping and configuration types

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod estimator;
pub mod output;
pub mod regulator;
pub mod safety;
pub mod traits;
