//! Control sequencing
//!
//! The mode controller is the only writer of control state. It is driven one
//! tick at a time with a button snapshot and a measurement, and answers with
//! the voltage command for the output stage.

pub mod controller;
pub mod input;
pub mod machine;

pub use controller::{ModeController, OutputCommand};
pub use input::{GestureEvent, HoldGesture, InputSnapshot, RepeatGate};
pub use machine::{Event, OutputState};
