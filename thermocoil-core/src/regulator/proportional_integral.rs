//! Proportional-integral regulator with guard bands
//!
//! Control happens in three zones around the setpoint:
//!
//! - below `setpoint - band`: the user's power ceiling is applied, ramping up
//!   as fast as the user asked for
//! - above `setpoint + band`: the output is cut
//! - inside the band: the power command is corrected by a proportional term
//!   scaled by the user's ceiling, an integral term and a damping term on the
//!   error change
//!
//! The band keeps the accumulated error from dominating far from the
//! setpoint. Uses integer math only.

use super::{ControlState, RegulationInput, RegulationStrategy};
use crate::config::PiTuning;

/// Proportional-integral power regulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProportionalIntegral {
    tuning: PiTuning,
    /// Power floor so a resistance reading stays available (mW)
    keep_alive_mw: u32,
}

impl ProportionalIntegral {
    /// Create a regulator
    pub const fn new(tuning: PiTuning, keep_alive_mw: u32) -> Self {
        Self {
            tuning,
            keep_alive_mw,
        }
    }

    /// Tuning in use
    pub const fn tuning(&self) -> &PiTuning {
        &self.tuning
    }

    /// Correction for the present state (mW)
    ///
    /// `ceiling * error * kp / scale + ki * sum + kd * (last_error - error)`
    pub fn correction(&self, state: &ControlState, ceiling_mw: u32) -> i64 {
        let t = &self.tuning;
        let error = state.error as i64;

        let p_term = if t.power_scale_mw == 0 {
            0
        } else {
            ceiling_mw as i64 * error * t.kp_x100 as i64 / (100 * t.power_scale_mw as i64)
        };
        let i_term = t.ki_x100 as i64 * state.error_sum as i64 / 100;
        let d_term = t.kd_x100 as i64 * (state.last_error as i64 - error) / 100;

        p_term + i_term + d_term
    }

    /// Guard band half-width for a setpoint (°C)
    pub fn band(&self, setpoint_c: u16) -> u32 {
        setpoint_c as u32 * self.tuning.band_percent as u32 / 100
    }
}

impl RegulationStrategy for ProportionalIntegral {
    fn regulate(&self, state: &mut ControlState, input: &RegulationInput) -> u32 {
        state.push_error(input.estimate_c, input.setpoint_c);
        state.error_sum = state.error_sum.saturating_add(state.error);

        let correction = self.correction(state, input.ceiling_mw);

        let band = self.band(input.setpoint_c);
        let setpoint = input.setpoint_c as u32;
        let estimate = input.estimate_c as u32;

        let power = if estimate < setpoint.saturating_sub(band) {
            input.ceiling_mw as i64
        } else if estimate > setpoint + band {
            0
        } else {
            input.power_mw as i64 + correction
        };

        // Floor first, the ceiling wins when it is below the floor
        power
            .max(self.keep_alive_mw as i64)
            .min(input.ceiling_mw as i64)
            .max(0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CEILING: u32 = 40_000;

    fn regulator() -> ProportionalIntegral {
        ProportionalIntegral::new(PiTuning::default(), 100)
    }

    fn input(estimate_c: u16, setpoint_c: u16, power_mw: u32) -> RegulationInput {
        RegulationInput {
            estimate_c,
            setpoint_c,
            power_mw,
            ceiling_mw: CEILING,
        }
    }

    #[test]
    fn test_below_band_applies_ceiling() {
        let mut state = ControlState::new();
        // 200 °C setpoint, band is 180..=220
        let power = regulator().regulate(&mut state, &input(150, 200, 500));
        assert_eq!(power, CEILING);
        assert_eq!(state.error, -50);
        assert_eq!(state.error_sum, -50);
    }

    #[test]
    fn test_above_band_cuts_to_keep_alive() {
        let mut state = ControlState::new();
        let power = regulator().regulate(&mut state, &input(240, 200, 30_000));
        assert_eq!(power, 100);
    }

    #[test]
    fn test_in_band_applies_correction() {
        let mut state = ControlState::new();
        let power = regulator().regulate(&mut state, &input(210, 200, 10_000));
        // P = 40000 * 10 / 750 = 533, I = 4 * 10 / 100 = 0, D = 0 - 10 = -10
        assert_eq!(power, 10_000 + 533 - 10);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let mut state = ControlState::new();
        let power = regulator().regulate(&mut state, &input(180, 200, 10_000));
        assert!(power < CEILING);

        let mut state = ControlState::new();
        let power = regulator().regulate(&mut state, &input(220, 200, 10_000));
        assert!(power > 100);
    }

    #[test]
    fn test_never_exceeds_ceiling() {
        let mut state = ControlState::new();
        let power = regulator().regulate(&mut state, &input(219, 200, CEILING));
        assert_eq!(power, CEILING);
    }

    #[test]
    fn test_ceiling_below_keep_alive_wins() {
        let mut state = ControlState::new();
        let power = regulator().regulate(
            &mut state,
            &RegulationInput {
                estimate_c: 240,
                setpoint_c: 200,
                power_mw: 0,
                ceiling_mw: 50,
            },
        );
        assert_eq!(power, 50);
    }

    #[test]
    fn test_error_sum_saturates() {
        let mut state = ControlState {
            error_sum: i16::MAX - 1,
            ..ControlState::new()
        };
        regulator().regulate(&mut state, &input(300, 200, 10_000));
        assert_eq!(state.error_sum, i16::MAX);
    }

    proptest! {
        #[test]
        fn prop_converges_at_setpoint(
            setpoint in 100u16..=315,
            ceiling in 100u32..=20_000,
            warmup in proptest::collection::vec(0u16..=450, 0..50),
            start_fraction in 0u32..=100,
        ) {
            let regulator = regulator();
            let mut state = ControlState::new();
            let mut power = ceiling * start_fraction / 100;
            let at = |estimate_c, power_mw| RegulationInput {
                estimate_c,
                setpoint_c: setpoint,
                power_mw,
                ceiling_mw: ceiling,
            };

            for temp in warmup {
                power = regulator.regulate(&mut state, &at(temp, power));
            }

            // Held at the setpoint the correction is constant, so the command
            // either stops moving or walks into a clamp. Each moving step is
            // at least 1 mW, so `ceiling + 2` regulations are enough.
            let mut settled = None;
            for tick in 0..(ceiling + 2) {
                let next = regulator.regulate(&mut state, &at(setpoint, power));
                if next == power {
                    settled = Some(tick);
                    break;
                }
                power = next;
            }
            prop_assert!(settled.is_some(), "power still moving at {}", power);

            for _ in 0..10 {
                prop_assert_eq!(regulator.regulate(&mut state, &at(setpoint, power)), power);
            }
        }
    }
}
