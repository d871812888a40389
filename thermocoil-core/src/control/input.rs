//! Duration-based button gates
//!
//! Key repeat and long-press detection are driven by tick timestamps instead
//! of blocking delays. Timestamps are wrapping milliseconds.

use crate::safety::FaultKind;
use crate::traits::Buttons;

/// Inputs sampled for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSnapshot {
    /// Buttons held this tick
    pub buttons: Buttons,
    /// Fault reported by the output stage, if any
    pub fault: Option<FaultKind>,
    /// Tick timestamp (ms, wrapping)
    pub now_ms: u32,
}

impl InputSnapshot {
    pub const fn new(buttons: Buttons, now_ms: u32) -> Self {
        Self {
            buttons,
            fault: None,
            now_ms,
        }
    }

    pub const fn with_fault(mut self, fault: FaultKind) -> Self {
        self.fault = Some(fault);
        self
    }
}

/// Milliseconds elapsed between two wrapping timestamps
pub const fn elapsed_ms(since_ms: u32, now_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

/// Rate limiter for held-button repeats
///
/// The first press acts immediately; while the button stays held, further
/// actions are allowed once per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RepeatGate {
    last_ms: Option<u32>,
}

impl RepeatGate {
    pub const fn new() -> Self {
        Self { last_ms: None }
    }

    /// Check if an action may happen now, and record it if so
    pub fn allow(&mut self, now_ms: u32, interval_ms: u32) -> bool {
        match self.last_ms {
            Some(last) if elapsed_ms(last, now_ms) < interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    /// Button released, the next press acts immediately
    pub fn release(&mut self) {
        self.last_ms = None;
    }
}

/// Result of feeding a hold gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GestureEvent {
    /// Nothing happened
    None,
    /// Gesture started this tick
    Pressed,
    /// Gesture held for the full duration, fires once per press
    Held,
}

/// Press-and-hold detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HoldGesture {
    hold_ms: u32,
    pressed_at: Option<u32>,
    fired: bool,
}

impl HoldGesture {
    pub const fn new(hold_ms: u32) -> Self {
        Self {
            hold_ms,
            pressed_at: None,
            fired: false,
        }
    }

    /// Feed the gesture state for this tick
    pub fn update(&mut self, active: bool, now_ms: u32) -> GestureEvent {
        if !active {
            self.pressed_at = None;
            self.fired = false;
            return GestureEvent::None;
        }

        match self.pressed_at {
            None => {
                self.pressed_at = Some(now_ms);
                GestureEvent::Pressed
            }
            Some(start) if !self.fired && elapsed_ms(start, now_ms) >= self.hold_ms => {
                self.fired = true;
                GestureEvent::Held
            }
            Some(_) => GestureEvent::None,
        }
    }

    /// Check if the gesture is currently held
    pub const fn is_active(&self) -> bool {
        self.pressed_at.is_some()
    }
}
