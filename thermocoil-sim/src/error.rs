//! Simulator errors

use thermocoil_core::config::ConfigError;
use thiserror::Error;

/// Everything that can stop a simulation run
#[derive(Error, Debug)]
pub enum SimError {
    /// Reading the tuning file or writing the trace failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The tuning file is not valid TOML for this layout
    #[error("invalid tuning file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The tuning file parsed but holds impossible values
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Run parameters that cannot be simulated
    #[error("invalid run parameters: {what}")]
    Run { what: &'static str },

    /// The calibration gesture did not reach temperature mode
    #[error("calibration gesture did not enable temperature regulation")]
    Calibration,
}
