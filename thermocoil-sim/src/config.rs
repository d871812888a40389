//! Tuning file layout
//!
//! Every section is optional; missing values fall back to the engine
//! defaults and a 0.5 Ohm 316L coil.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thermocoil_core::config::{ControllerConfig, RegulatorKind};
use thermocoil_core::estimator::CalibrationTable;
use thermocoil_drivers::atomizer::CoilModel;

use crate::error::SimError;

/// Contents of a tuning file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimFile {
    pub controller: ControllerConfig,
    pub coil: CoilSpec,
    pub run: RunSpec,
}

impl SimFile {
    /// Load and validate a tuning file
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate tuning file contents
    pub fn parse(content: &str) -> Result<Self, SimError> {
        let file: SimFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.controller.validate()?;
        self.coil.table.validate()?;

        if self.coil.cold_resistance_mohm == 0 {
            return Err(SimError::Run { what: "coil resistance must be non-zero" });
        }
        if self.coil.heat_capacity_mj_per_c <= 0.0 {
            return Err(SimError::Run { what: "coil heat capacity must be positive" });
        }
        if self.run.tick_ms == 0 || self.run.sample_every_ms == 0 {
            return Err(SimError::Run { what: "tick and sample intervals must be non-zero" });
        }
        if self.run.regulators.is_empty() {
            return Err(SimError::Run { what: "no regulator to run" });
        }
        Ok(())
    }
}

/// Simulated coil parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoilSpec {
    pub cold_resistance_mohm: u16,
    pub ambient_c: f32,
    pub heat_capacity_mj_per_c: f32,
    pub loss_mw_per_c: f32,
    /// Resistance ratios of the wire, which may differ from the controller's table
    pub table: CalibrationTable,
}

impl Default for CoilSpec {
    fn default() -> Self {
        let model = CoilModel::default();
        Self {
            cold_resistance_mohm: model.cold_resistance_mohm,
            ambient_c: model.ambient_c,
            heat_capacity_mj_per_c: model.heat_capacity_mj_per_c,
            loss_mw_per_c: model.loss_mw_per_c,
            table: model.table,
        }
    }
}

impl From<&CoilSpec> for CoilModel {
    fn from(spec: &CoilSpec) -> Self {
        CoilModel {
            cold_resistance_mohm: spec.cold_resistance_mohm,
            ambient_c: spec.ambient_c,
            heat_capacity_mj_per_c: spec.heat_capacity_mj_per_c,
            loss_mw_per_c: spec.loss_mw_per_c,
            table: spec.table,
        }
    }
}

/// Run parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSpec {
    /// Control period (ms)
    pub tick_ms: u32,
    /// How long fire is held (ms)
    pub fire_ms: u32,
    /// Idle time recorded after release (ms)
    pub cooldown_ms: u32,
    /// Trace row interval (ms)
    pub sample_every_ms: u32,
    /// Calibrate and regulate temperature; otherwise fire in power mode
    pub temperature_mode: bool,
    /// Regulators to compare, run one after the other
    pub regulators: Vec<RegulatorKind>,
}

impl Default for RunSpec {
    fn default() -> Self {
        Self {
            tick_ms: 2,
            fire_ms: 3000,
            cooldown_ms: 500,
            sample_every_ms: 20,
            temperature_mode: true,
            regulators: vec![RegulatorKind::ProportionalIntegral, RegulatorKind::ThresholdRamp],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermocoil_core::config::{ConfigError, OverrangePolicy};

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = SimFile::parse("").unwrap();
        assert_eq!(file.controller, ControllerConfig::default());
        assert_eq!(file.run.tick_ms, 2);
        assert_eq!(file.run.regulators.len(), 2);
    }

    #[test]
    fn test_partial_sections() {
        let file = SimFile::parse(
            r#"
            [controller]
            regulator = "ThresholdRamp"
            initial_power_mw = 30000
            overrange = { Saturate = 999 }

            [controller.pi]
            ki_x100 = 8

            [coil]
            cold_resistance_mohm = 300

            [run]
            regulators = ["ThresholdRamp"]
            "#,
        )
        .unwrap();

        assert_eq!(file.controller.regulator, RegulatorKind::ThresholdRamp);
        assert_eq!(file.controller.initial_power_mw, 30_000);
        assert_eq!(file.controller.overrange, OverrangePolicy::Saturate(999));
        assert_eq!(file.controller.pi.ki_x100, 8);
        assert_eq!(file.controller.pi.kp_x100, 100);
        assert_eq!(file.coil.cold_resistance_mohm, 300);
        assert_eq!(file.coil.ambient_c, 20.0);
        assert_eq!(file.run.regulators, vec![RegulatorKind::ThresholdRamp]);
    }

    #[test]
    fn test_rejects_bad_table() {
        let result = SimFile::parse(
            r#"
            [controller]
            table = [978, 1030, 1080, 1126, 1126, 1207, 1246, 1283, 1318]
            "#,
        );
        assert!(matches!(
            result,
            Err(SimError::Config(ConfigError::TableNotIncreasing))
        ));
    }

    #[test]
    fn test_rejects_unparsable_file() {
        let result = SimFile::parse("[controller\n");
        assert!(matches!(result, Err(SimError::Toml(_))));
    }

    #[test]
    fn test_rejects_zero_tick() {
        let result = SimFile::parse("[run]\ntick_ms = 0\n");
        assert!(matches!(result, Err(SimError::Run { .. })));
    }
}
