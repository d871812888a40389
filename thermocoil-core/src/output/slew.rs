//! Slew limiting and output ceilings
//!
//! While firing in power mode the voltage follows resistance changes
//! gradually: a flaky low reading must not make the voltage plummet and stop
//! the coil, so decreases are limited to 10 mV per tick. Increases are pushed
//! 100 mV at a time to hit harder on temperature-sensitive coils while still
//! staying under control.
//!
//! The ceilings are always applied afterwards, in order: voltage, power,
//! current. Each may tighten the previous result.

use super::mapper::{implied_current_ma, implied_power_mw, volts_for_power, VOLTS_STEP_MV};
use crate::config::Limits;

/// Clamps that fired while limiting a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitFlags {
    /// Rate of change was limited
    pub slew: bool,
    /// Voltage ceiling applied
    pub voltage: bool,
    /// Power ceiling applied
    pub power: bool,
    /// Current ceiling applied
    pub current: bool,
}

impl LimitFlags {
    /// Check if any ceiling (not the slew) fired
    pub const fn any_ceiling(&self) -> bool {
        self.voltage || self.power || self.current
    }
}

/// Electrical context the ceilings are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitContext {
    /// Present coil resistance (mΩ)
    pub resistance_mohm: u16,
    /// Power command the voltage is meant to deliver (mW)
    pub power_mw: u32,
    /// User power ceiling (mW)
    pub ceiling_mw: u32,
}

/// Result of limiting a voltage command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitOutcome {
    /// Voltage to emit (mV)
    pub volts_mv: u16,
    /// Power command after the power ceiling (mW)
    pub power_mw: u32,
    /// Clamps that fired
    pub flags: LimitFlags,
}

/// Slew limiter with output stage ceilings
///
/// The current ceiling bounds the current implied by the power command
/// (`P / V`), not the coil current `V / R`. It raises the voltage to keep
/// the power command, so on a low-resistance coil the real current and the
/// real power `V² / R` can end up above `max_current_ma` and the ceiling:
/// 3750 mV into 150 mΩ is 25 A and 93.75 W. The output stage must enforce
/// its own hardware current limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlewLimiter {
    limits: Limits,
    /// Largest decrease per tick (mV)
    fall_step_mv: u16,
    /// Increase applied per tick when the command rises (mV)
    rise_bias_mv: u16,
}

impl SlewLimiter {
    /// Default largest decrease per tick (mV)
    pub const FALL_STEP_MV: u16 = 10;
    /// Default increase per tick (mV)
    pub const RISE_BIAS_MV: u16 = 100;

    /// Create a limiter for the given output stage limits
    pub const fn new(limits: Limits) -> Self {
        Self {
            limits,
            fall_step_mv: Self::FALL_STEP_MV,
            rise_bias_mv: Self::RISE_BIAS_MV,
        }
    }

    /// Output stage limits in use
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Compute the next voltage command
    ///
    /// # Arguments
    /// - `previous_mv`: voltage emitted last tick
    /// - `candidate_mv`: voltage the regulation layer asks for
    /// - `energized`: output is firing
    /// - `slew`: rate limiting applies (power mode, or no calibration)
    /// - `context`: resistance, power command and ceiling
    pub fn limit(
        &self,
        previous_mv: u16,
        candidate_mv: u16,
        energized: bool,
        slew: bool,
        context: &LimitContext,
    ) -> LimitOutcome {
        let mut flags = LimitFlags::default();
        let mut volts = candidate_mv;

        if energized && slew && candidate_mv != previous_mv {
            volts = if candidate_mv < previous_mv {
                previous_mv.saturating_sub(self.fall_step_mv)
            } else {
                previous_mv.saturating_add(self.rise_bias_mv)
            };
            flags.slew = volts != candidate_mv;
        }

        // Voltage ceiling
        if volts > self.limits.max_volts_mv {
            volts = self.limits.max_volts_mv;
            flags.voltage = true;
        }

        // Power ceiling
        let resistance = context.resistance_mohm;
        let ceiling = context.ceiling_mw;
        let mut power = context.power_mw;
        if power > ceiling || implied_power_mw(volts, resistance) > ceiling {
            power = power.min(ceiling);
            let mut capped = volts_for_power(ceiling, resistance);
            // Rounding to the nearest step may land just above the ceiling
            if implied_power_mw(capped, resistance) > ceiling {
                capped = capped.saturating_sub(VOLTS_STEP_MV);
            }
            volts = volts.min(capped);
            flags.power = true;
        }

        // Current ceiling, holding the power command constant
        let max_current = self.limits.max_current_ma;
        if volts > 0 && max_current > 0 && implied_current_ma(power, volts) > max_current {
            let needed = (power as u64 * 1000).div_ceil(max_current as u64);
            volts = needed.min(u16::MAX as u64) as u16;
            flags.current = true;
        }

        LimitOutcome {
            volts_mv: volts,
            power_mw: power,
            flags,
        }
    }
}

impl Default for SlewLimiter {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn context(resistance_mohm: u16, power_mw: u32, ceiling_mw: u32) -> LimitContext {
        LimitContext {
            resistance_mohm,
            power_mw,
            ceiling_mw,
        }
    }

    #[test]
    fn test_idle_passes_candidate() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(1000, 2240, false, true, &context(500, 10_000, 10_000));
        assert_eq!(out.volts_mv, 2240);
        assert_eq!(out.flags, LimitFlags::default());
    }

    #[test]
    fn test_energized_decrease_is_slow() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(2240, 1500, true, true, &context(500, 10_000, 10_000));
        assert_eq!(out.volts_mv, 2230);
        assert!(out.flags.slew);
    }

    #[test]
    fn test_energized_increase_overshoots_by_bias() {
        let limiter = SlewLimiter::default();
        // 2200 -> 2240 asked; pushed to 2300, then the power ceiling pulls it back
        let out = limiter.limit(2200, 2240, true, true, &context(500, 10_000, 10_000));
        assert_eq!(out.volts_mv, 2230);
        assert!(out.flags.power);

        // Plenty of headroom: the bias is kept
        let out = limiter.limit(2200, 2240, true, true, &context(500, 10_000, 40_000));
        assert_eq!(out.volts_mv, 2300);
        assert!(!out.flags.power);
    }

    #[test]
    fn test_regulated_output_is_not_slewed() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(4000, 260, true, false, &context(700, 100, 40_000));
        assert_eq!(out.volts_mv, 260);
        assert!(!out.flags.slew);
    }

    #[test]
    fn test_zero_previous_floor() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(5, 0, true, true, &context(500, 0, 10_000));
        assert_eq!(out.volts_mv, 0);
    }

    #[test]
    fn test_voltage_ceiling() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(0, 9500, false, false, &context(3000, 75_000, 75_000));
        assert_eq!(out.volts_mv, 9000);
        assert!(out.flags.voltage);
    }

    #[test]
    fn test_power_command_above_ceiling() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(0, 2240, false, false, &context(500, 12_000, 10_000));
        assert_eq!(out.power_mw, 10_000);
        assert!(out.flags.power);
        assert!(implied_power_mw(out.volts_mv, 500) <= 10_000);
    }

    #[test]
    fn test_current_ceiling_recomputes_from_power() {
        let limiter = SlewLimiter::default();
        // 75 W into 0.15 Ω: 3354 mV is 22.4 A for the commanded power
        let candidate = volts_for_power(75_000, 150);
        assert!(implied_current_ma(75_000, candidate) > 20_000);

        let out = limiter.limit(0, candidate, false, false, &context(150, 75_000, 75_000));
        assert_eq!(u32::from(out.volts_mv), 1000 * 75_000 / 20_000);
        assert_eq!(out.volts_mv, 3750);
        assert!(out.flags.current);
    }

    #[test]
    fn test_current_ceiling_bounds_commanded_current_only() {
        let limiter = SlewLimiter::default();
        let out = limiter.limit(0, 3354, false, false, &context(150, 75_000, 75_000));
        assert_eq!(out.volts_mv, 3750);
        assert!(implied_current_ma(out.power_mw, out.volts_mv) <= 20_000);
        // Coil current V/R is 25 A and V²/R is 93.75 W
        assert_eq!(u32::from(out.volts_mv) * 1000 / 150, 25_000);
        assert!(implied_power_mw(out.volts_mv, 150) > 75_000);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_ceilings(
            ceiling in 0u32..=75_000,
            power_fraction in 0u32..=100,
            margin in 10u16..=3000,
            candidates in proptest::collection::vec((0u16..=12_000, any::<bool>(), any::<bool>()), 1..40),
        ) {
            let limiter = SlewLimiter::default();
            let limits = *limiter.limits();
            let power = ceiling * power_fraction / 100;
            // Below ceiling/400 mΩ the current clamp must win over the power clamp
            let resistance = (ceiling / 400) as u16 + margin;
            let ctx = context(resistance, power, ceiling);

            let mut volts = 0u16;
            for (candidate, energized, slew) in candidates {
                let out = limiter.limit(volts, candidate, energized, slew, &ctx);
                prop_assert!(out.volts_mv <= limits.max_volts_mv);
                prop_assert!(out.power_mw <= ceiling);
                prop_assert!(implied_current_ma(out.power_mw, out.volts_mv) <= limits.max_current_ma);
                prop_assert!(
                    implied_power_mw(out.volts_mv, resistance) <= ceiling,
                    "V={} R={} ceiling={}", out.volts_mv, resistance, ceiling
                );
                volts = out.volts_mv;
            }
        }
    }
}
