//! Mode controller
//!
//! Sequences one control tick:
//!
//! 1. Safety: latch the fault reported by the output stage
//! 2. Fire button: energize, release or force off on fault
//! 3. While idle: setpoint adjust and the calibration gesture
//! 4. Candidate voltage: regulated in temperature mode, mapped from the
//!    power command otherwise
//! 5. Slew limiting and output ceilings
//! 6. Reference tracking and display estimate refresh

use super::input::{elapsed_ms, GestureEvent, HoldGesture, InputSnapshot, RepeatGate};
use super::machine::{Event, OutputState};
use crate::config::{ControllerConfig, Mode};
use crate::estimator::TemperatureEstimator;
use crate::output::{implied_current_ma, volts_for_power, LimitContext, LimitFlags, SlewLimiter};
use crate::regulator::{ControlState, PowerRegulator, RegulationInput};
use crate::safety::{FaultKind, SafetyMonitor, SafetyStatus};
use crate::traits::{Buttons, Measurement};

/// Output command produced by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputCommand {
    /// Voltage to set on the output stage (mV)
    pub volts_mv: u16,
    /// Output should be on
    pub energize: bool,
    /// Fault reported this tick
    pub fault: Option<FaultKind>,
    /// Ceilings and slew limits that fired
    pub limits: LimitFlags,
}

/// Mode controller, the only writer of control state
#[derive(Debug, Clone)]
pub struct ModeController {
    config: ControllerConfig,
    estimator: TemperatureEstimator,
    regulator: PowerRegulator,
    limiter: SlewLimiter,
    safety: SafetyMonitor,
    state: OutputState,
    mode: Mode,
    /// User power ceiling (mW)
    watts_def: u32,
    /// Live power command (mW)
    watts: u32,
    setpoint_c: u16,
    /// Resistance at the calibration point, 0 when uncalibrated (mΩ)
    reference_mohm: u16,
    /// Last emitted voltage (mV)
    volts_mv: u16,
    last_regulation_ms: Option<u32>,
    adjust: RepeatGate,
    calibration: HoldGesture,
    /// Mode to switch to once the calibration gesture is held
    pending_mode: Option<Mode>,
    last_buttons: Buttons,
}

impl ModeController {
    /// Create a controller, idle and uncalibrated
    ///
    /// The configuration is used as given; call
    /// [`ControllerConfig::validate`] first for user-supplied values.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            estimator: TemperatureEstimator::new(config.table, config.overrange),
            regulator: PowerRegulator::from_config(&config),
            limiter: SlewLimiter::new(config.limits),
            safety: SafetyMonitor::new(),
            state: OutputState::Idle,
            mode: config.initial_mode,
            watts_def: config.initial_power_mw,
            watts: config.initial_power_mw,
            setpoint_c: config.initial_setpoint_c,
            reference_mohm: 0,
            volts_mv: 0,
            last_regulation_ms: None,
            adjust: RepeatGate::new(),
            calibration: HoldGesture::new(config.ui.mode_hold_ms),
            pending_mode: None,
            last_buttons: Buttons::NONE,
            config,
        }
    }

    /// Run one control tick
    pub fn tick(&mut self, input: &InputSnapshot, measurement: &Measurement) -> OutputCommand {
        let now = input.now_ms;
        let buttons = input.buttons;
        let resistance = measurement.resistance_mohm;

        let status = self.safety.update(input.fault);
        self.handle_fire(buttons, status, resistance, now);

        if self.state.is_energized() {
            self.calibration.update(false, now);
            self.pending_mode = None;
            self.adjust.release();
        } else {
            self.watts = if status.is_fault() { 0 } else { self.watts_def };
            self.handle_buttons(buttons, resistance, now);
        }

        let energized = self.state.is_energized();
        let regulating = self.is_regulating();
        let candidate = if energized && regulating {
            self.regulated_volts(resistance, now)
        } else {
            volts_for_power(self.watts, resistance)
        };

        let outcome = self.limiter.limit(
            self.volts_mv,
            candidate,
            energized,
            !regulating,
            &LimitContext {
                resistance_mohm: resistance,
                power_mw: self.watts,
                ceiling_mw: self.watts_def,
            },
        );
        self.volts_mv = outcome.volts_mv;
        self.watts = outcome.power_mw;

        self.refresh_estimate(resistance, energized);
        self.last_buttons = buttons;

        OutputCommand {
            volts_mv: self.volts_mv,
            energize: energized,
            fault: status.fault(),
            limits: outcome.flags,
        }
    }

    fn handle_fire(&mut self, buttons: Buttons, status: SafetyStatus, resistance: u16, now: u32) {
        match self.state {
            OutputState::Idle if buttons.fire() => {
                if self.safety.energize_permitted(resistance) {
                    self.state = self.state.transition(Event::Fire);
                    self.regulator.reset();
                    self.last_regulation_ms = None;
                    info!("energized at {} ms, {} mOhm", now, resistance);
                } else if !self.last_buttons.fire() {
                    warn!("fire rejected: {} mOhm, {}", resistance, status);
                }
            }
            OutputState::Energized => {
                if let SafetyStatus::Fault(kind) = status {
                    self.state = self.state.transition(Event::Fault(kind));
                    self.watts = 0;
                    self.regulator.reset();
                    warn!("forced off: {}", kind);
                } else if !buttons.fire() {
                    self.state = self.state.transition(Event::Release);
                    self.watts = self.watts_def;
                    self.regulator.reset();
                    info!("released at {} ms", now);
                }
            }
            OutputState::Idle => {}
        }
    }

    fn handle_buttons(&mut self, buttons: Buttons, resistance: u16, now: u32) {
        let (up, down) = (buttons.up(), buttons.down());

        // A new gesture needs UP+DOWN pressed on an idle tick, not carried
        // over from a fire
        let was_both = self.last_buttons.up() && self.last_buttons.down();
        let gesture = up && down && (self.calibration.is_active() || !was_both);

        match self.calibration.update(gesture, now) {
            GestureEvent::Pressed => self.toggle_calibration(resistance),
            GestureEvent::Held => {
                if let Some(mode) = self.pending_mode.take() {
                    self.mode = mode;
                    info!("mode: {}", mode);
                }
            }
            GestureEvent::None => {}
        }

        if up == down {
            self.adjust.release();
            return;
        }

        let interval = match self.mode {
            Mode::Power => self.config.ui.power_repeat_ms,
            Mode::Temperature => self.config.ui.temp_repeat_ms,
        };
        if !self.adjust.allow(now, interval) {
            return;
        }

        match (self.mode, up) {
            (Mode::Power, true) => self.power_up(resistance),
            (Mode::Power, false) => self.power_down(),
            (Mode::Temperature, true) => {
                let next = self.setpoint_c.saturating_add(self.config.ui.temp_step_c);
                self.setpoint_c = next.min(self.config.ui.max_setpoint_c);
            }
            (Mode::Temperature, false) => {
                let next = self.setpoint_c.saturating_sub(self.config.ui.temp_step_c);
                self.setpoint_c = next.max(self.config.ui.min_setpoint_c);
            }
        }
    }

    fn power_up(&mut self, resistance: u16) {
        let limits = &self.config.limits;
        let next = self.watts_def.saturating_add(self.config.ui.power_step_mw);
        let volts = volts_for_power(next, resistance);

        if volts > 0
            && volts <= limits.max_volts_mv
            && next <= limits.max_watt_mw
            && implied_current_ma(next, volts) < limits.max_current_ma
        {
            self.watts_def = next;
            self.watts = next;
        }
    }

    fn power_down(&mut self) {
        let step = self.config.ui.power_step_mw;
        if self.watts_def >= step {
            self.watts_def -= step;
            self.watts = self.watts_def;
        }
    }

    fn toggle_calibration(&mut self, resistance: u16) {
        if self.reference_mohm != 0 {
            self.reference_mohm = 0;
            self.pending_mode = Some(Mode::Power);
            info!("calibration cleared");
        } else if resistance != 0 {
            self.reference_mohm = resistance;
            self.pending_mode = Some(Mode::Temperature);
            info!("calibrated at {} mOhm", resistance);
        } else {
            self.pending_mode = None;
            warn!("calibration rejected: no resistance reading");
        }
    }

    fn regulated_volts(&mut self, resistance: u16, now: u32) -> u16 {
        let due = match self.last_regulation_ms {
            None => true,
            Some(last) => elapsed_ms(last, now) >= self.config.regulation_interval_ms,
        };

        let candidate = if due {
            self.last_regulation_ms = Some(now);
            let estimate_c =
                self.estimator
                    .estimate(resistance, self.reference_mohm, self.temperature_c());
            self.watts = self.regulator.update(&RegulationInput {
                estimate_c,
                setpoint_c: self.setpoint_c,
                power_mw: self.watts,
                ceiling_mw: self.watts_def,
            });
            debug!("regulated: {} C -> {} mW", estimate_c, self.watts);
            volts_for_power(self.watts, resistance)
        } else {
            self.volts_mv
        };

        // Keep some output so the next resistance reading is possible
        if self.volts_mv == 0 {
            self.config.keep_alive_mv
        } else {
            candidate
        }
    }

    fn refresh_estimate(&mut self, resistance: u16, energized: bool) {
        if self.reference_mohm == 0 {
            return;
        }

        if energized
            && self.config.track_reference
            && resistance < self.reference_mohm
            && resistance > self.config.min_reference_mohm
        {
            debug!("reference {} -> {} mOhm", self.reference_mohm, resistance);
            self.reference_mohm = resistance;
        }

        let estimate_c = self
            .estimator
            .estimate(resistance, self.reference_mohm, self.temperature_c());
        self.regulator.record_estimate(estimate_c);
    }

    /// Temperature regulation is active (temperature mode and calibrated)
    pub fn is_regulating(&self) -> bool {
        self.mode == Mode::Temperature && self.reference_mohm != 0
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Temperature setpoint (°C)
    pub fn setpoint_c(&self) -> u16 {
        self.setpoint_c
    }

    /// User power ceiling (mW)
    pub fn power_ceiling_mw(&self) -> u32 {
        self.watts_def
    }

    /// Live power command (mW)
    pub fn power_mw(&self) -> u32 {
        self.watts
    }

    /// Last coil temperature estimate (°C)
    pub fn temperature_c(&self) -> u16 {
        self.regulator.state().estimate_c
    }

    /// Calibration reference, 0 when uncalibrated (mΩ)
    pub fn reference_mohm(&self) -> u16 {
        self.reference_mohm
    }

    /// Last emitted voltage (mV)
    pub fn volts_mv(&self) -> u16 {
        self.volts_mv
    }

    pub fn is_energized(&self) -> bool {
        self.state.is_energized()
    }

    pub fn output_state(&self) -> OutputState {
        self.state
    }

    pub fn control_state(&self) -> &ControlState {
        self.regulator.state()
    }

    /// Most recent fault, including one that has since cleared
    pub fn last_fault(&self) -> Option<FaultKind> {
        self.safety.last_fault()
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
