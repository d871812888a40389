//! Atomizer driver
//!
//! Owns the output stage and the mode controller. Each poll reads the
//! stage, runs one controller tick and writes the command back.

use thermocoil_core::config::ControllerConfig;
use thermocoil_core::control::{InputSnapshot, ModeController, OutputCommand};
use thermocoil_core::traits::{AtomizerOutput, AtomizerSensor, ButtonInput, TickClock};

/// Atomizer driver binding an output stage to the controller
pub struct AtomizerDriver<H> {
    hardware: H,
    controller: ModeController,
    /// Voltage last written to the stage (mV)
    written_mv: Option<u16>,
}

impl<H: AtomizerSensor + AtomizerOutput> AtomizerDriver<H> {
    /// Create a new driver
    ///
    /// The output is switched off before anything else happens.
    pub fn new(mut hardware: H, config: ControllerConfig) -> Self {
        hardware.set_enabled(false);
        Self {
            hardware,
            controller: ModeController::new(config),
            written_mv: None,
        }
    }

    /// Run one control tick
    pub fn poll<B, C>(&mut self, buttons: &mut B, clock: &C) -> OutputCommand
    where
        B: ButtonInput,
        C: TickClock,
    {
        let measurement = self.hardware.read_measurement();
        let input = InputSnapshot {
            buttons: buttons.buttons(),
            fault: self.hardware.fault_state().kind(),
            now_ms: clock.now_ms(),
        };

        let command = self.controller.tick(&input, &measurement);
        self.apply(&command);
        command
    }

    fn apply(&mut self, command: &OutputCommand) {
        // Switch off before touching the voltage, switch on after
        if !command.energize && self.hardware.is_enabled() {
            self.hardware.set_enabled(false);
        }

        if self.written_mv != Some(command.volts_mv) {
            self.hardware.set_output_voltage(command.volts_mv);
            self.written_mv = Some(command.volts_mv);
        }

        if command.energize && !self.hardware.is_enabled() {
            self.hardware.set_enabled(true);
        }
    }

    /// Get access to the underlying output stage
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Get mutable access to the underlying output stage
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }
}
