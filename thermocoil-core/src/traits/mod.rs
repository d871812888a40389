//! Hardware abstraction traits
//!
//! These traits define the interface between the regulation engine and the
//! vendor-supplied atomizer services (measurement, output stage, buttons,
//! tick clock).

pub mod atomizer;
pub mod input;

pub use atomizer::{AtomizerOutput, AtomizerSensor, FaultState, Measurement};
pub use input::{ButtonInput, Buttons, TickClock};
