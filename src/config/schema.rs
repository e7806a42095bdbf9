//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use crate::port::{FlowControl, PortConfiguration};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modem connection
    pub modem: ModemConfig,
    /// SIM credentials
    pub sim: SimConfig,
    /// Timing of the SIM test sequence
    pub sequence: SequenceConfig,
    /// Harness run settings
    pub harness: HarnessConfig,
    /// Simulated driver settings (used with `--simulate`)
    pub simulation: SimulationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Modem section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Serial port the modem's AT interface is on
    pub port: Option<String>,
    /// Target modem identifier, e.g. "QUECTEL_BG96"
    pub device: Option<String>,
    /// Baud rate
    pub baud: u32,
    /// Flow control: "none", "software", "hardware"
    pub flow_control: FlowControl,
    /// How long the modem may take to start answering AT after power-on
    pub ready_timeout_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: None,
            device: None,
            baud: 115200,
            flow_control: FlowControl::None,
            ready_timeout_ms: 30_000,
        }
    }
}

impl ModemConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Serial settings for opening the modem port.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud,
            flow_control: self.flow_control,
            ..PortConfiguration::default()
        }
    }
}

/// SIM section.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// PIN used for unlock and PIN-query toggling
    pub pin: Option<String>,
}

impl std::fmt::Debug for SimConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimConfig")
            .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How the sequence waits for the SIM interface after setting the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// Sleep the whole settle period
    #[default]
    Fixed,
    /// Poll the device until it answers or the settle period runs out
    Poll,
}

/// Sequence timing section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Modem-side operation timeout set before the SIM calls
    pub sim_timeout_ms: u64,
    /// Wait before the first SIM call
    pub settle_ms: u64,
    /// Wait before each later SIM call
    pub step_delay_ms: u64,
    pub settle_mode: SettleMode,
    /// Poll interval in `poll` settle mode
    pub poll_interval_ms: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            sim_timeout_ms: 9000,
            settle_ms: 4000,
            step_delay_ms: 1000,
            settle_mode: SettleMode::Fixed,
            poll_interval_ms: 250,
        }
    }
}

impl SequenceConfig {
    pub fn sim_timeout(&self) -> Duration {
        Duration::from_millis(self.sim_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Same settings with every wait removed, for simulated runs.
    pub fn without_delays(mut self) -> Self {
        self.settle_ms = 0;
        self.step_delay_ms = 0;
        self
    }
}

/// Harness section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Global run timeout in seconds
    pub timeout_secs: u64,
    /// Host test name announced at setup
    pub host_test: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10 * 60,
            host_test: "default_auto".to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Simulated modem section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// IMSI the simulated SIM reports
    pub imsi: String,
    /// Whether the simulated modem rejects PIN-query changes as unsupported
    pub pin_query_unsupported: bool,
    /// Keep the configured sequence delays instead of running instantly
    pub real_time: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            imsi: crate::driver::TEST_IMSI.to_string(),
            pin_query_unsupported: false,
            real_time: false,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
