//! Regulator tuning
//!
//! The coefficients are empirical and meant to be re-tuned per hardware.
//! Gains use the "value × 100" convention so configuration stays integer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which power regulator runs in temperature mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegulatorKind {
    /// Error-accumulating regulator with guard bands
    #[default]
    ProportionalIntegral,
    /// Coarse step-wise regulator
    ThresholdRamp,
}

/// Proportional-integral regulator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PiTuning {
    /// Proportional gain (value × 100)
    pub kp_x100: i16,
    /// Integral gain (value × 100)
    pub ki_x100: i16,
    /// Derivative damping gain (value × 100)
    pub kd_x100: i16,
    /// Divisor applied to `ceiling × error` in the proportional term (mW)
    pub power_scale_mw: u32,
    /// Guard band around the setpoint (percent)
    ///
    /// Below the band the ceiling is applied, above it the output is cut.
    pub band_percent: u8,
}

impl Default for PiTuning {
    fn default() -> Self {
        Self {
            kp_x100: 100,
            ki_x100: 4,
            kd_x100: 100,
            power_scale_mw: 750, // 75 W full scale / 100
            band_percent: 10,
        }
    }
}

/// Threshold ramp regulator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RampTuning {
    /// Power step near the setpoint (mW per regulation)
    pub step_mw: u32,
    /// Power step when far from the setpoint (mW per regulation)
    pub boost_step_mw: u32,
    /// Distance from the setpoint beyond which the boost step applies (°C)
    pub boost_threshold_c: u16,
}

impl Default for RampTuning {
    fn default() -> Self {
        Self {
            step_mw: 500,
            boost_step_mw: 2000,
            boost_threshold_c: 50,
        }
    }
}
