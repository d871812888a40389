//! Resistance ratio calibration table
//!
//! Maps coil temperature to the ratio of hot resistance over the resistance
//! at the 20 °C calibration point, scaled by 1000. One entry every 50 °C from
//! 0 °C to 400 °C; linear interpolation is done between entries.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Number of table entries
pub const TABLE_POINTS: usize = 9;

/// Temperature distance between entries (°C)
pub const TABLE_STEP_C: u16 = 50;

/// Ratio scale: a ratio of 1000 means "same resistance as the reference"
pub const RATIO_SCALE: u32 = 1000;

/// Calibration table of resistance ratios
///
/// Invariant: ratios are strictly increasing. Deserialized tables are
/// checked by [`CalibrationTable::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CalibrationTable {
    ratios: [u16; TABLE_POINTS],
}

impl CalibrationTable {
    /// 316L stainless steel (temperature factor of resistance)
    ///
    /// 0, 50, 100, 150, 200, 250, 300, 350, 400 °C
    pub const SS316L: Self = Self {
        ratios: [978, 1030, 1080, 1126, 1168, 1207, 1246, 1283, 1318],
    };

    /// Create a table from custom ratios
    pub fn new(ratios: [u16; TABLE_POINTS]) -> Result<Self, ConfigError> {
        let table = Self { ratios };
        table.validate()?;
        Ok(table)
    }

    /// Check the ratios are strictly increasing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ratios.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::TableNotIncreasing);
        }
        Ok(())
    }

    /// Raw ratios
    pub const fn ratios(&self) -> &[u16; TABLE_POINTS] {
        &self.ratios
    }

    /// Ratio at a table index
    #[inline]
    pub const fn ratio(&self, index: usize) -> u32 {
        self.ratios[index] as u32
    }

    /// Temperature of a table index (°C)
    #[inline]
    pub const fn temperature(index: usize) -> u32 {
        index as u32 * TABLE_STEP_C as u32
    }

    /// Ratio expected at a temperature (inverse lookup)
    ///
    /// Clamped to the first entry below 0 °C and extrapolated from the last
    /// segment above 400 °C.
    pub fn ratio_at(&self, temp_c: u16) -> u32 {
        let step = TABLE_STEP_C as u32;
        let temp = temp_c as u32;
        let last = TABLE_POINTS - 1;
        let index = ((temp / step) as usize).min(last - 1);

        let lower = self.ratio(index);
        let upper = self.ratio(index + 1);
        let offset = temp - Self::temperature(index);
        lower + (upper - lower) * offset / step
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::SS316L
    }
}
