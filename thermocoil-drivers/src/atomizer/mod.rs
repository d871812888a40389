//! Atomizer output stage drivers

pub mod driver;
pub mod sim;

pub use driver::AtomizerDriver;
pub use sim::{CoilModel, SimButtons, SimClock, SimulatedCoil};
