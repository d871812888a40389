//! Controller configuration

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::limits::Limits;
use super::tuning::{PiTuning, RampTuning, RegulatorKind};
use crate::estimator::CalibrationTable;

/// What the up/down buttons adjust, and whether temperature is regulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// Fixed power; buttons adjust the power ceiling
    #[default]
    Power,
    /// Temperature control; buttons adjust the temperature setpoint
    Temperature,
}

/// Estimator behavior at or above the last calibration table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OverrangePolicy {
    /// Continue the last table segment linearly, without an upper clamp
    #[default]
    Extrapolate,
    /// Report a fixed marker temperature (°C)
    Saturate(u16),
}

impl OverrangePolicy {
    /// Conventional over-range marker
    pub const SENTINEL_C: u16 = 999;
}

/// Button handling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UiConfig {
    /// Power ceiling adjustment step (mW)
    pub power_step_mw: u32,
    /// Temperature setpoint adjustment step (°C)
    pub temp_step_c: u16,
    /// Lowest selectable temperature setpoint (°C)
    pub min_setpoint_c: u16,
    /// Highest selectable temperature setpoint (°C)
    pub max_setpoint_c: u16,
    /// Minimum time between repeated power steps while a button is held (ms)
    pub power_repeat_ms: u32,
    /// Minimum time between repeated temperature steps (ms)
    pub temp_repeat_ms: u32,
    /// Hold time of the up+down gesture before the mode switches (ms)
    pub mode_hold_ms: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            power_step_mw: 100,
            temp_step_c: 5,
            min_setpoint_c: 100,
            max_setpoint_c: 315,
            power_repeat_ms: 25,
            temp_repeat_ms: 100,
            mode_hold_ms: 1000,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Output stage ceilings
    pub limits: Limits,
    /// Regulator used in temperature mode
    pub regulator: RegulatorKind,
    /// Proportional-integral tuning
    pub pi: PiTuning,
    /// Threshold ramp tuning
    pub ramp: RampTuning,
    /// Resistance ratio table of the coil wire
    pub table: CalibrationTable,
    /// Estimator over-range behavior
    pub overrange: OverrangePolicy,
    /// Button handling
    pub ui: UiConfig,
    /// Mode at start-up
    pub initial_mode: Mode,
    /// Power ceiling at start-up (mW)
    pub initial_power_mw: u32,
    /// Temperature setpoint at start-up (°C)
    pub initial_setpoint_c: u16,
    /// Minimum power while regulating, so a resistance reading stays available (mW)
    pub keep_alive_mw: u32,
    /// Voltage substituted for a zero command while regulating (mV)
    pub keep_alive_mv: u16,
    /// Interval between regulator updates while energized (ms)
    pub regulation_interval_ms: u32,
    /// Lower the calibration reference when a colder reading shows up while firing
    pub track_reference: bool,
    /// Readings at or below this are never used as a new reference (mΩ)
    pub min_reference_mohm: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            regulator: RegulatorKind::default(),
            pi: PiTuning::default(),
            ramp: RampTuning::default(),
            table: CalibrationTable::default(),
            overrange: OverrangePolicy::default(),
            ui: UiConfig::default(),
            initial_mode: Mode::Power,
            initial_power_mw: 10_000,
            initial_setpoint_c: 200,
            keep_alive_mw: 100,
            keep_alive_mv: 100,
            regulation_interval_ms: 2,
            track_reference: true,
            min_reference_mohm: 50,
        }
    }
}

impl ControllerConfig {
    /// Check the configuration for values the controller cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table.validate()?;
        let limits = &self.limits;
        if limits.max_volts_mv == 0 || limits.max_watt_mw == 0 || limits.max_current_ma == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if limits.current_clamp_volts_mv() > limits.max_volts_mv as u32 {
            return Err(ConfigError::LimitsInconsistent);
        }
        if self.pi.power_scale_mw == 0 {
            return Err(ConfigError::ZeroPowerScale);
        }
        if self.pi.band_percent > 100 {
            return Err(ConfigError::BandTooWide);
        }
        if self.ui.min_setpoint_c > self.ui.max_setpoint_c {
            return Err(ConfigError::SetpointRangeInverted);
        }
        if self.initial_setpoint_c < self.ui.min_setpoint_c
            || self.initial_setpoint_c > self.ui.max_setpoint_c
        {
            return Err(ConfigError::SetpointOutOfRange);
        }
        if self.initial_power_mw > limits.max_watt_mw {
            return Err(ConfigError::PowerAboveLimit);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Calibration table ratios are not strictly increasing
    TableNotIncreasing,
    /// A hard limit is zero
    ZeroLimit,
    /// The current clamp would demand more than the voltage ceiling
    LimitsInconsistent,
    /// Proportional scale divisor is zero
    ZeroPowerScale,
    /// Guard band wider than the setpoint itself
    BandTooWide,
    /// Minimum setpoint above maximum setpoint
    SetpointRangeInverted,
    /// Start-up setpoint outside the selectable range
    SetpointOutOfRange,
    /// Start-up power above the output stage limit
    PowerAboveLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::TableNotIncreasing => "calibration table must be strictly increasing",
            ConfigError::ZeroLimit => "voltage, power and current limits must be non-zero",
            ConfigError::LimitsInconsistent => "current limit demands more than the voltage limit",
            ConfigError::ZeroPowerScale => "proportional power scale must be non-zero",
            ConfigError::BandTooWide => "guard band must be at most 100 percent",
            ConfigError::SetpointRangeInverted => "minimum setpoint above maximum setpoint",
            ConfigError::SetpointOutOfRange => "initial setpoint outside the selectable range",
            ConfigError::PowerAboveLimit => "initial power above the output power limit",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for ConfigError {}
