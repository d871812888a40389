//! Power to voltage mapping
//!
//! Units: mV, mW, mΩ, mA. With those units `V = sqrt(P * R)` and
//! `P = V² / R` hold without extra scaling.

/// Voltage command resolution (mV)
pub const VOLTS_STEP_MV: u16 = 10;

/// Voltage that delivers `power_mw` into `resistance_mohm`
///
/// Rounded to the nearest 10 mV. Returns 0 when the resistance is 0, which
/// means the output cannot be energized.
pub fn volts_for_power(power_mw: u32, resistance_mohm: u16) -> u16 {
    if resistance_mohm == 0 {
        return 0;
    }
    let step = VOLTS_STEP_MV as u64;
    let exact = (power_mw as u64 * resistance_mohm as u64).isqrt();
    let rounded = (exact + step / 2) / step * step;
    rounded.min(u16::MAX as u64) as u16
}

/// Power dissipated by `volts_mv` across `resistance_mohm` (mW)
///
/// Returns 0 when the resistance is unknown.
pub fn implied_power_mw(volts_mv: u16, resistance_mohm: u16) -> u32 {
    if resistance_mohm == 0 {
        return 0;
    }
    let volts = volts_mv as u64;
    (volts * volts / resistance_mohm as u64).min(u32::MAX as u64) as u32
}

/// Current needed to deliver `power_mw` at `volts_mv` (mA)
///
/// Returns 0 when the voltage is 0.
pub fn implied_current_ma(power_mw: u32, volts_mv: u16) -> u32 {
    if volts_mv == 0 {
        return 0;
    }
    (power_mw as u64 * 1000 / volts_mv as u64).min(u32::MAX as u64) as u32
}
