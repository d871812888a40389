//! Atomizer measurement and output stage traits

use crate::safety::FaultKind;

/// Measurement snapshot taken from the atomizer output stage
///
/// All fields may be stale or zero; a zero resistance means no reading was
/// available this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Coil resistance in milliohms
    pub resistance_mohm: u16,
    /// Output current in milliamps
    pub current_ma: u32,
    /// Output voltage actually measured, in millivolts
    pub voltage_mv: u16,
}

impl Measurement {
    /// Snapshot with no usable reading
    pub const UNAVAILABLE: Self = Self {
        resistance_mohm: 0,
        current_ma: 0,
        voltage_mv: 0,
    };

    /// Snapshot carrying only a resistance reading
    pub const fn with_resistance(resistance_mohm: u16) -> Self {
        Self {
            resistance_mohm,
            current_ma: 0,
            voltage_mv: 0,
        }
    }

    /// Check if a resistance reading is present
    pub const fn has_resistance(&self) -> bool {
        self.resistance_mohm != 0
    }
}

/// Fault condition reported by the output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultState {
    /// No fault
    #[default]
    Ok,
    /// Coil shorted
    Short,
    /// No coil attached
    Open,
    /// Battery too weak to fire
    WeakBattery,
    /// Board too hot
    OverTemp,
}

impl FaultState {
    /// Fault kind, or `None` when the stage reports no fault
    pub const fn kind(self) -> Option<FaultKind> {
        match self {
            FaultState::Ok => None,
            FaultState::Short => Some(FaultKind::Short),
            FaultState::Open => Some(FaultKind::Open),
            FaultState::WeakBattery => Some(FaultKind::WeakBattery),
            FaultState::OverTemp => Some(FaultKind::OverTemp),
        }
    }

    /// Check if a fault is active
    pub const fn is_fault(self) -> bool {
        !matches!(self, FaultState::Ok)
    }
}

/// Source of atomizer measurements and fault state
///
/// Takes `&mut self` because reading the output stage usually triggers an
/// ADC conversion.
pub trait AtomizerSensor {
    /// Read resistance, current and voltage
    fn read_measurement(&mut self) -> Measurement;

    /// Read the fault condition latched by the output stage
    fn fault_state(&mut self) -> FaultState;
}

/// Atomizer output stage (buck/boost converter feeding the coil)
pub trait AtomizerOutput {
    /// Set the output voltage in millivolts
    fn set_output_voltage(&mut self, volts_mv: u16);

    /// Switch the output on or off
    fn set_enabled(&mut self, on: bool);

    /// Check if the output is currently on
    fn is_enabled(&self) -> bool;
}
