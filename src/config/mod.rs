//! Configuration module for cellular-sim-check.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `CELLULAR_SIM_CONFIG` environment variable (explicit path)
//! 2. `./cellular-sim.toml` (current directory)
//! 3. The platform config directory (`~/.config/cellular-sim/cellular-sim.toml` on Linux)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `CELLULAR_SIM_<SECTION>_<KEY>`
//!
//! Examples:
//! - `CELLULAR_SIM_MODEM_PORT=/dev/ttyUSB2`
//! - `CELLULAR_SIM_MODEM_DEVICE=QUECTEL_BG96`
//! - `CELLULAR_SIM_PIN=1234`
//!
//! # Support gate
//!
//! A run without a SIM PIN, or an AT run without a modem port and device
//! identifier, is not a failure: [`Config::check_supported`] reports it as
//! [`NotSupported`] and the runner skips.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult, NotSupported};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, validate, ConfigLoader,
};
pub use schema::{
    Config, HarnessConfig, LogFormat, LoggingConfig, ModemConfig, SequenceConfig, SettleMode,
    SimConfig, SimulationConfig,
};

/// Which driver stack a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// AT commands over the configured serial port.
    At,
    /// In-memory simulated modem.
    Simulated,
}

impl Config {
    /// Check that everything the selected backend needs is configured.
    pub fn check_supported(&self, backend: Backend) -> Result<(), NotSupported> {
        if self.sim.pin.as_deref().map_or(true, str::is_empty) {
            return Err(NotSupported(
                "SIM pin code is needed. Skipping this run.".to_string(),
            ));
        }
        if backend == Backend::At {
            if self.modem.device.is_none() {
                return Err(NotSupported("modem.device must be defined".to_string()));
            }
            if self.modem.port.is_none() {
                return Err(NotSupported(
                    "modem.port is needed to reach the modem".to_string(),
                ));
            }
        }
        Ok(())
    }
}
