//! Closed-loop power regulation
//!
//! In temperature mode a regulator turns the estimated coil temperature and
//! the setpoint into a power command. Two strategies share the
//! [`RegulationStrategy`] interface:
//!
//! - [`ProportionalIntegral`]: error-accumulating control inside a guard band
//! - [`ThresholdRamp`]: coarse step-wise control
//!
//! [`PowerRegulator`] owns the selected strategy together with the
//! [`ControlState`] it works on.

pub mod proportional_integral;
pub mod threshold_ramp;

pub use proportional_integral::ProportionalIntegral;
pub use threshold_ramp::ThresholdRamp;

use crate::config::{ControllerConfig, RegulatorKind};
use crate::estimator::BASELINE_C;

/// Regulation state, reset on every power-on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlState {
    /// Present error, estimate minus setpoint (°C)
    pub error: i16,
    /// Error of the previous regulation (°C)
    pub last_error: i16,
    /// Accumulated error (°C × regulations)
    pub error_sum: i16,
    /// Last temperature estimate (°C)
    pub estimate_c: u16,
}

impl ControlState {
    /// Initial state
    pub const fn new() -> Self {
        Self {
            error: 0,
            last_error: 0,
            error_sum: 0,
            estimate_c: BASELINE_C,
        }
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Shift in a new error sample
    fn push_error(&mut self, estimate_c: u16, setpoint_c: u16) {
        self.last_error = self.error;
        self.error = error_between(estimate_c, setpoint_c);
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs of one regulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegulationInput {
    /// Estimated coil temperature (°C)
    pub estimate_c: u16,
    /// Temperature setpoint (°C)
    pub setpoint_c: u16,
    /// Present power command (mW)
    pub power_mw: u32,
    /// User power ceiling (mW)
    pub ceiling_mw: u32,
}

/// A power regulation strategy
pub trait RegulationStrategy {
    /// Compute the next power command (mW)
    ///
    /// Implementations update `state` in place and must never return more
    /// than `input.ceiling_mw`.
    fn regulate(&self, state: &mut ControlState, input: &RegulationInput) -> u32;
}

/// Selected strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Strategy {
    ProportionalIntegral(ProportionalIntegral),
    ThresholdRamp(ThresholdRamp),
}

impl RegulationStrategy for Strategy {
    fn regulate(&self, state: &mut ControlState, input: &RegulationInput) -> u32 {
        match self {
            Strategy::ProportionalIntegral(pi) => pi.regulate(state, input),
            Strategy::ThresholdRamp(ramp) => ramp.regulate(state, input),
        }
    }
}

/// Power regulator: a strategy plus the state it owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerRegulator {
    strategy: Strategy,
    state: ControlState,
}

impl PowerRegulator {
    /// Create a regulator with a fresh state
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            state: ControlState::new(),
        }
    }

    /// Create the regulator selected by the configuration
    pub fn from_config(config: &ControllerConfig) -> Self {
        let strategy = match config.regulator {
            RegulatorKind::ProportionalIntegral => Strategy::ProportionalIntegral(
                ProportionalIntegral::new(config.pi, config.keep_alive_mw),
            ),
            RegulatorKind::ThresholdRamp => {
                Strategy::ThresholdRamp(ThresholdRamp::new(config.ramp, config.keep_alive_mw))
            }
        };
        Self::new(strategy)
    }

    /// Which strategy is running
    pub const fn kind(&self) -> RegulatorKind {
        match self.strategy {
            Strategy::ProportionalIntegral(_) => RegulatorKind::ProportionalIntegral,
            Strategy::ThresholdRamp(_) => RegulatorKind::ThresholdRamp,
        }
    }

    /// Current regulation state
    pub const fn state(&self) -> &ControlState {
        &self.state
    }

    /// Run one regulation and return the new power command (mW)
    pub fn update(&mut self, input: &RegulationInput) -> u32 {
        self.state.estimate_c = input.estimate_c;
        self.strategy.regulate(&mut self.state, input)
    }

    /// Record an estimate taken outside a regulation (display refresh)
    pub fn record_estimate(&mut self, estimate_c: u16) {
        self.state.estimate_c = estimate_c;
    }

    /// Reset the regulation state
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

/// Signed difference `estimate - setpoint`, saturated to `i16`
pub fn error_between(estimate_c: u16, setpoint_c: u16) -> i16 {
    let diff = estimate_c as i32 - setpoint_c as i32;
    diff.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(estimate_c: u16, power_mw: u32) -> RegulationInput {
        RegulationInput {
            estimate_c,
            setpoint_c: 200,
            power_mw,
            ceiling_mw: 30_000,
        }
    }

    #[test]
    fn test_error_between_saturates() {
        assert_eq!(error_between(250, 200), 50);
        assert_eq!(error_between(150, 200), -50);
        assert_eq!(error_between(u16::MAX, 0), i16::MAX);
    }

    #[test]
    fn test_from_config_selects_strategy() {
        let mut config = ControllerConfig::default();
        assert_eq!(
            PowerRegulator::from_config(&config).kind(),
            RegulatorKind::ProportionalIntegral
        );
        config.regulator = RegulatorKind::ThresholdRamp;
        assert_eq!(
            PowerRegulator::from_config(&config).kind(),
            RegulatorKind::ThresholdRamp
        );
    }

    #[test]
    fn test_reset_clears_state() {
        let mut regulator = PowerRegulator::from_config(&ControllerConfig::default());
        regulator.update(&input(205, 10_000));
        regulator.update(&input(210, 10_000));
        assert_ne!(regulator.state().error_sum, 0);
        assert_eq!(regulator.state().estimate_c, 210);

        regulator.reset();
        assert_eq!(*regulator.state(), ControlState::new());
    }

    #[test]
    fn test_strategies_diverge_on_identical_inputs() {
        let mut pi = PowerRegulator::from_config(&ControllerConfig::default());
        let mut ramp = PowerRegulator::from_config(&ControllerConfig {
            regulator: RegulatorKind::ThresholdRamp,
            ..Default::default()
        });

        let temps = [150, 185, 195, 205, 215, 230, 210, 198];
        let mut pi_power = 30_000;
        let mut ramp_power = 30_000;
        let mut differed = false;
        for temp in temps {
            pi_power = pi.update(&input(temp, pi_power));
            ramp_power = ramp.update(&input(temp, ramp_power));
            assert!(pi_power <= 30_000 && ramp_power <= 30_000);
            differed |= pi_power != ramp_power;
        }
        assert!(differed);
    }
}
