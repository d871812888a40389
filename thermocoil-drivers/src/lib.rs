//! Collaborator implementations for the thermocoil engine
//!
//! This crate binds the traits defined in thermocoil-core to something that
//! can actually be driven:
//!
//! - Atomizer driver running the mode controller against an output stage
//! - Simulated coil with a lumped thermal model, for host-side tuning

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod atomizer;
