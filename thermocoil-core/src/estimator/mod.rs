//! Coil temperature estimation
//!
//! The coil resistance rises predictably with temperature. Given the
//! resistance captured at the 20 °C calibration point, the ratio of the
//! present resistance over that reference is looked up in a
//! [`CalibrationTable`] and interpolated.

pub mod table;

pub use table::{CalibrationTable, RATIO_SCALE, TABLE_POINTS, TABLE_STEP_C};

use crate::config::OverrangePolicy;

/// Temperature assumed at the calibration point (°C)
pub const BASELINE_C: u16 = 20;

/// Readings closer than this to the reference snap to the baseline (mΩ)
pub const DEADBAND_MOHM: u16 = 5;

/// Resistance-to-temperature estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureEstimator {
    table: CalibrationTable,
    overrange: OverrangePolicy,
}

impl TemperatureEstimator {
    /// Create an estimator from a table and an over-range policy
    pub const fn new(table: CalibrationTable, overrange: OverrangePolicy) -> Self {
        Self { table, overrange }
    }

    /// Calibration table in use
    pub const fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Over-range policy in use
    pub const fn overrange(&self) -> OverrangePolicy {
        self.overrange
    }

    /// Estimate the coil temperature (°C)
    ///
    /// # Arguments
    /// - `resistance_mohm`: present coil resistance, 0 if no reading
    /// - `reference_mohm`: resistance at the calibration point, 0 if uncalibrated
    /// - `previous_c`: last estimate, returned when no reading is available
    pub fn estimate(&self, resistance_mohm: u16, reference_mohm: u16, previous_c: u16) -> u16 {
        if resistance_mohm == 0 {
            return previous_c;
        }
        if reference_mohm == 0 {
            return BASELINE_C;
        }
        if resistance_mohm < reference_mohm {
            return 0;
        }

        let ratio = RATIO_SCALE * resistance_mohm as u32 / reference_mohm as u32;

        // Around the calibration point, assume it is the calibration temperature
        if resistance_mohm - reference_mohm < DEADBAND_MOHM {
            return BASELINE_C;
        }

        let table = &self.table;
        let last = TABLE_POINTS - 1;

        if ratio <= table.ratio(0) {
            return 0;
        }
        if ratio >= table.ratio(last) {
            return match self.overrange {
                OverrangePolicy::Extrapolate => saturate(interpolate(table, last, ratio)),
                OverrangePolicy::Saturate(sentinel) => sentinel,
            };
        }

        // First entry at or above the ratio; the lower index wins ties
        let upper = (1..last)
            .find(|&i| table.ratio(i) >= ratio)
            .unwrap_or(last);

        saturate(interpolate(table, upper, ratio))
    }
}

/// Interpolate on the segment ending at `upper`
///
/// For ratios past the end of the segment this extrapolates linearly.
fn interpolate(table: &CalibrationTable, upper: usize, ratio: u32) -> u32 {
    let lower_ratio = table.ratio(upper - 1);
    let span = table.ratio(upper) - lower_ratio;
    CalibrationTable::temperature(upper - 1) + TABLE_STEP_C as u32 * (ratio - lower_ratio) / span
}

fn saturate(temp_c: u32) -> u16 {
    temp_c.min(u16::MAX as u32) as u16
}
