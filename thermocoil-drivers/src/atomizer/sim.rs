//! Simulated atomizer
//!
//! A single coil modelled as one thermal mass: electrical power heats it,
//! losses to the wick and air are proportional to the temperature rise
//! over ambient. The resistance follows the same ratio table the estimator
//! uses, so a correctly calibrated controller should read back the model
//! temperature.
//!
//! Units follow the engine (mV, mΩ, mW, ms); the model itself runs in `f32`.

use thermocoil_core::estimator::{CalibrationTable, TABLE_POINTS, TABLE_STEP_C};
use thermocoil_core::traits::{
    AtomizerOutput, AtomizerSensor, ButtonInput, Buttons, FaultState, Measurement, TickClock,
};

/// Physical parameters of a simulated coil
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoilModel {
    /// Resistance at ambient temperature (mΩ)
    pub cold_resistance_mohm: u16,
    /// Ambient temperature (°C)
    pub ambient_c: f32,
    /// Heat capacity of coil, wick and liquid (mJ/°C)
    pub heat_capacity_mj_per_c: f32,
    /// Heat loss per degree above ambient (mW/°C)
    pub loss_mw_per_c: f32,
    /// Resistance ratio table of the wire
    pub table: CalibrationTable,
}

impl Default for CoilModel {
    fn default() -> Self {
        // 0.5 Ohm 316L build, about 20 W to hold 200 °C
        Self {
            cold_resistance_mohm: 500,
            ambient_c: 20.0,
            heat_capacity_mj_per_c: 50.0,
            loss_mw_per_c: 110.0,
            table: CalibrationTable::SS316L,
        }
    }
}

impl CoilModel {
    /// Resistance ratio at a temperature (×1000), extrapolated at both ends
    pub fn ratio_at(&self, temp_c: f32) -> f32 {
        let step = TABLE_STEP_C as f32;
        let index = ((temp_c / step) as i32).clamp(0, TABLE_POINTS as i32 - 2) as usize;

        let lower = self.table.ratio(index) as f32;
        let upper = self.table.ratio(index + 1) as f32;
        lower + (upper - lower) * (temp_c - index as f32 * step) / step
    }

    /// Coil resistance at a temperature (mΩ)
    pub fn resistance_at(&self, temp_c: f32) -> f32 {
        self.cold_resistance_mohm as f32 * self.ratio_at(temp_c) / self.ratio_at(self.ambient_c)
    }
}

/// Simulated output stage with a coil attached
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimulatedCoil {
    model: CoilModel,
    temperature_c: f32,
    volts_mv: u16,
    enabled: bool,
    connected: bool,
    fault: FaultState,
    /// Upcoming measurements reported as unavailable
    dropped_readings: u32,
}

impl SimulatedCoil {
    /// Create a coil at ambient temperature
    pub fn new(model: CoilModel) -> Self {
        Self {
            temperature_c: model.ambient_c,
            model,
            volts_mv: 0,
            enabled: false,
            connected: true,
            fault: FaultState::Ok,
            dropped_readings: 0,
        }
    }

    pub fn model(&self) -> &CoilModel {
        &self.model
    }

    /// True coil temperature (°C)
    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    /// True coil resistance (mΩ)
    pub fn resistance_mohm(&self) -> f32 {
        self.model.resistance_at(self.temperature_c)
    }

    /// Electrical power going into the coil (mW)
    pub fn power_mw(&self) -> f32 {
        if !self.is_driving() {
            return 0.0;
        }
        let volts = self.volts_mv as f32;
        volts * volts / self.resistance_mohm()
    }

    fn is_driving(&self) -> bool {
        self.enabled && self.connected && !self.fault.is_fault()
    }

    /// Advance the thermal model
    pub fn step(&mut self, dt_ms: u32) {
        let losses = self.model.loss_mw_per_c * (self.temperature_c - self.model.ambient_c);
        let net_mw = self.power_mw() - losses;
        self.temperature_c += net_mw * dt_ms as f32 / (1000.0 * self.model.heat_capacity_mj_per_c);
    }

    /// Latch a fault in the output stage, `FaultState::Ok` clears it
    pub fn inject_fault(&mut self, fault: FaultState) {
        self.fault = fault;
    }

    /// Attach or remove the coil
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Report the next `count` measurements as unavailable
    pub fn drop_readings(&mut self, count: u32) {
        self.dropped_readings = count;
    }
}

impl AtomizerSensor for SimulatedCoil {
    fn read_measurement(&mut self) -> Measurement {
        if !self.connected {
            return Measurement::UNAVAILABLE;
        }
        if self.dropped_readings > 0 {
            self.dropped_readings -= 1;
            return Measurement::UNAVAILABLE;
        }

        let resistance = self.resistance_mohm();
        let mut measurement = Measurement::with_resistance((resistance + 0.5) as u16);
        if self.is_driving() {
            measurement.voltage_mv = self.volts_mv;
            measurement.current_ma = (self.volts_mv as f32 * 1000.0 / resistance) as u32;
        }
        measurement
    }

    fn fault_state(&mut self) -> FaultState {
        if !self.connected {
            FaultState::Open
        } else {
            self.fault
        }
    }
}

impl AtomizerOutput for SimulatedCoil {
    fn set_output_voltage(&mut self, volts_mv: u16) {
        self.volts_mv = volts_mv;
    }

    fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Manually advanced clock
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimClock {
    now_ms: u32,
}

impl SimClock {
    pub const fn new() -> Self {
        Self { now_ms: 0 }
    }

    pub fn advance(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }
}

impl TickClock for SimClock {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }
}

/// Scripted button state
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimButtons {
    held: Buttons,
}

impl SimButtons {
    pub const fn new() -> Self {
        Self {
            held: Buttons::NONE,
        }
    }

    /// Replace the held buttons
    pub fn hold(&mut self, buttons: Buttons) {
        self.held = buttons;
    }

    pub fn release_all(&mut self) {
        self.held = Buttons::NONE;
    }
}

impl ButtonInput for SimButtons {
    fn buttons(&mut self) -> Buttons {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomizer::AtomizerDriver;
    use thermocoil_core::config::{ControllerConfig, Mode, RegulatorKind};
    use thermocoil_core::safety::FaultKind;

    const TICK_MS: u32 = 2;

    struct Bench {
        driver: AtomizerDriver<SimulatedCoil>,
        buttons: SimButtons,
        clock: SimClock,
    }

    impl Bench {
        fn new(config: ControllerConfig) -> Self {
            Self {
                driver: AtomizerDriver::new(SimulatedCoil::new(CoilModel::default()), config),
                buttons: SimButtons::new(),
                clock: SimClock::new(),
            }
        }

        /// Run for `duration_ms`, returning the coil temperature after each tick
        fn run(&mut self, buttons: Buttons, duration_ms: u32) -> Vec<f32> {
            self.buttons.hold(buttons);
            let mut trace = Vec::new();
            for _ in 0..duration_ms / TICK_MS {
                self.driver.poll(&mut self.buttons, &self.clock);
                self.driver.hardware_mut().step(TICK_MS);
                self.clock.advance(TICK_MS);
                trace.push(self.driver.hardware().temperature_c());
            }
            trace
        }

        /// Calibrate on the cold coil and switch to temperature mode
        fn calibrate(&mut self) {
            self.run(Buttons::UP | Buttons::DOWN, 1100);
            self.run(Buttons::NONE, 100);
            assert_eq!(self.driver.controller().mode(), Mode::Temperature);
        }
    }

    fn config(regulator: RegulatorKind) -> ControllerConfig {
        ControllerConfig {
            regulator,
            initial_power_mw: 30_000,
            initial_setpoint_c: 200,
            ..Default::default()
        }
    }

    /// Fire for 3 s in temperature mode and return the temperature trace
    fn regulated_trace(regulator: RegulatorKind) -> Vec<f32> {
        let mut bench = Bench::new(config(regulator));
        bench.calibrate();
        assert_eq!(bench.driver.controller().reference_mohm(), 500);
        bench.run(Buttons::FIRE, 3000)
    }

    #[test]
    fn test_model_resistance_follows_table() {
        let model = CoilModel::default();
        assert!((model.resistance_at(20.0) - 500.0).abs() < 0.01);
        // 200 °C is ratio 1168 against about 999 at 20 °C
        let hot = model.resistance_at(200.0);
        assert!(hot > 580.0 && hot < 590.0);
    }

    #[test]
    fn test_coil_heats_and_cools() {
        let mut coil = SimulatedCoil::new(CoilModel::default());
        coil.set_output_voltage(3000);
        coil.set_enabled(true);
        for _ in 0..100 {
            coil.step(TICK_MS);
        }
        let hot = coil.temperature_c();
        assert!(hot > 60.0);

        coil.set_enabled(false);
        for _ in 0..100 {
            coil.step(TICK_MS);
        }
        assert!(coil.temperature_c() < hot);
        assert!(coil.temperature_c() > 20.0);
    }

    #[test]
    fn test_disconnected_coil_reports_open() {
        let mut coil = SimulatedCoil::new(CoilModel::default());
        coil.set_connected(false);
        assert_eq!(coil.read_measurement(), Measurement::UNAVAILABLE);
        assert_eq!(coil.fault_state(), FaultState::Open);
    }

    #[test]
    fn test_dropped_readings() {
        let mut coil = SimulatedCoil::new(CoilModel::default());
        coil.drop_readings(2);
        assert!(!coil.read_measurement().has_resistance());
        assert!(!coil.read_measurement().has_resistance());
        assert_eq!(coil.read_measurement().resistance_mohm, 500);
    }

    #[test]
    fn test_pi_holds_guard_band() {
        let trace = regulated_trace(RegulatorKind::ProportionalIntegral);
        let settled = &trace[trace.len() / 2..];
        for &temp in settled {
            assert!((170.0..=230.0).contains(&temp), "temperature {}", temp);
        }
    }

    #[test]
    fn test_ramp_holds_guard_band() {
        let trace = regulated_trace(RegulatorKind::ThresholdRamp);
        let settled = &trace[trace.len() / 2..];
        for &temp in settled {
            assert!((170.0..=230.0).contains(&temp), "temperature {}", temp);
        }
    }

    #[test]
    fn test_regulators_differ() {
        let pi = regulated_trace(RegulatorKind::ProportionalIntegral);
        let ramp = regulated_trace(RegulatorKind::ThresholdRamp);
        let largest_gap = pi
            .iter()
            .zip(&ramp)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(largest_gap > 5.0);
    }

    #[test]
    fn test_power_mode_runs_hotter() {
        let mut bench = Bench::new(config(RegulatorKind::ProportionalIntegral));
        let trace = bench.run(Buttons::FIRE, 3000);
        assert!(trace[trace.len() - 1] > 250.0);
    }

    #[test]
    fn test_estimate_tracks_model() {
        let mut bench = Bench::new(config(RegulatorKind::ThresholdRamp));
        bench.calibrate();
        bench.run(Buttons::FIRE, 2000);
        let estimate = bench.driver.controller().temperature_c() as f32;
        let actual = bench.driver.hardware().temperature_c();
        assert!((estimate - actual).abs() < 5.0, "{} vs {}", estimate, actual);
    }

    #[test]
    fn test_disconnect_while_firing() {
        let mut bench = Bench::new(config(RegulatorKind::ProportionalIntegral));
        bench.run(Buttons::FIRE, 100);
        assert!(bench.driver.hardware().is_enabled());

        bench.driver.hardware_mut().set_connected(false);
        bench.run(Buttons::FIRE, 10);
        assert!(!bench.driver.hardware().is_enabled());
        assert_eq!(bench.driver.controller().last_fault(), Some(FaultKind::Open));
    }
}
