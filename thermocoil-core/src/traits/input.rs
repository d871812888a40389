//! Button and clock traits

use core::ops::BitOr;

/// Snapshot of the three device buttons as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(u8);

impl Buttons {
    /// No button pressed
    pub const NONE: Self = Self(0);
    /// Fire button
    pub const FIRE: Self = Self(1 << 0);
    /// Up / right button
    pub const UP: Self = Self(1 << 1);
    /// Down / left button
    pub const DOWN: Self = Self(1 << 2);

    /// Create from raw bits, ignoring unknown bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check if every button in `other` is pressed
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn fire(self) -> bool {
        self.contains(Self::FIRE)
    }

    pub const fn up(self) -> bool {
        self.contains(Self::UP)
    }

    pub const fn down(self) -> bool {
        self.contains(Self::DOWN)
    }
}

impl BitOr for Buttons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Source of button state, sampled once per tick
pub trait ButtonInput {
    fn buttons(&mut self) -> Buttons;
}

/// Millisecond clock driving the control tick
///
/// The counter is allowed to wrap; consumers compare with `wrapping_sub`.
pub trait TickClock {
    fn now_ms(&self) -> u32;
}
