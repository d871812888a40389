//! Threshold ramp regulator
//!
//! Walks the power command up while the coil is below the setpoint and down
//! while it is above, in fixed steps. Far from the setpoint a larger step is
//! used. No error history is kept beyond the last sample.

use super::{ControlState, RegulationInput, RegulationStrategy};
use crate::config::RampTuning;

/// Step-wise power regulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThresholdRamp {
    tuning: RampTuning,
    /// Lowest power command while firing (mW)
    keep_alive_mw: u32,
}

impl ThresholdRamp {
    pub const fn new(tuning: RampTuning, keep_alive_mw: u32) -> Self {
        Self {
            tuning,
            keep_alive_mw,
        }
    }

    pub const fn tuning(&self) -> &RampTuning {
        &self.tuning
    }

    /// Step size for an error (mW)
    fn step(&self, error: i16) -> u32 {
        if error.unsigned_abs() > self.tuning.boost_threshold_c {
            self.tuning.boost_step_mw
        } else {
            self.tuning.step_mw
        }
    }
}

impl RegulationStrategy for ThresholdRamp {
    fn regulate(&self, state: &mut ControlState, input: &RegulationInput) -> u32 {
        state.push_error(input.estimate_c, input.setpoint_c);

        let step = self.step(state.error);
        let power = match state.error {
            e if e < 0 => input.power_mw.saturating_add(step),
            e if e > 0 => input.power_mw.saturating_sub(step),
            _ => input.power_mw,
        };

        // Floor first, the ceiling wins
        power.max(self.keep_alive_mw).min(input.ceiling_mw)
    }
}
