//! Output stage limits

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum default output voltage, in millivolts
pub const ATOMIZER_MAX_VOLTS: u16 = 9000;

/// Maximum default output power, in milliwatts
pub const ATOMIZER_MAX_WATT: u32 = 75_000;

/// Maximum default output current, in milliamps
pub const ATOMIZER_MAX_CURRENT: u32 = 20_000;

/// Hard ceilings of the output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    /// Maximum output voltage (mV)
    pub max_volts_mv: u16,
    /// Maximum output power (mW)
    pub max_watt_mw: u32,
    /// Maximum output current (mA)
    pub max_current_ma: u32,
}

impl Limits {
    /// Presa TC75W limits
    pub const PRESA_TC75W: Self = Self {
        max_volts_mv: ATOMIZER_MAX_VOLTS,
        max_watt_mw: ATOMIZER_MAX_WATT,
        max_current_ma: ATOMIZER_MAX_CURRENT,
    };

    /// Voltage the current ceiling can demand at full power
    ///
    /// The current clamp raises the voltage to `1000 * P / I_max`; this must
    /// stay below the voltage ceiling for the limits to be consistent.
    pub const fn current_clamp_volts_mv(&self) -> u32 {
        if self.max_current_ma == 0 {
            return u32::MAX;
        }
        ((self.max_watt_mw as u64 * 1000).div_ceil(self.max_current_ma as u64)) as u32
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::PRESA_TC75W
    }
}
