//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, SettleMode};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "CELLULAR_SIM";

/// Config file name
const CONFIG_FILE_NAME: &str = "cellular-sim.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "CELLULAR_SIM_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `CELLULAR_SIM_CONFIG` environment variable (explicit path)
    /// 2. `./cellular-sim.toml` (current directory)
    /// 3. the platform config directory (`~/.config/cellular-sim/` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Environment overrides still apply.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cellular-sim").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse `var` into `target` if it is set.
fn override_parsed<T: FromStr>(var: &str, target: &mut T, what: &str) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(var) {
        *target = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}")))?;
    }
    Ok(())
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `CELLULAR_SIM_<SECTION>_<KEY>`
/// For example:
/// - `CELLULAR_SIM_MODEM_PORT=/dev/ttyUSB2`
/// - `CELLULAR_SIM_SEQUENCE_SETTLE_MS=6000`
/// - `CELLULAR_SIM_PIN=1234` (short form of `CELLULAR_SIM_SIM_PIN`)
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Modem overrides
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_MODEM_PORT")) {
        config.modem.port = Some(val);
    }
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_MODEM_DEVICE")) {
        config.modem.device = Some(val);
    }
    override_parsed(
        &format!("{ENV_PREFIX}_MODEM_BAUD"),
        &mut config.modem.baud,
        "baud rate",
    )?;
    override_parsed(
        &format!("{ENV_PREFIX}_MODEM_READY_TIMEOUT_MS"),
        &mut config.modem.ready_timeout_ms,
        "timeout",
    )?;

    // SIM overrides
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_PIN"))
        .or_else(|_| std::env::var(format!("{ENV_PREFIX}_SIM_PIN")))
    {
        config.sim.pin = Some(val);
    }

    // Sequence overrides
    override_parsed(
        &format!("{ENV_PREFIX}_SEQUENCE_SIM_TIMEOUT_MS"),
        &mut config.sequence.sim_timeout_ms,
        "timeout",
    )?;
    override_parsed(
        &format!("{ENV_PREFIX}_SEQUENCE_SETTLE_MS"),
        &mut config.sequence.settle_ms,
        "settle period",
    )?;
    override_parsed(
        &format!("{ENV_PREFIX}_SEQUENCE_STEP_DELAY_MS"),
        &mut config.sequence.step_delay_ms,
        "step delay",
    )?;
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_SEQUENCE_SETTLE_MODE")) {
        config.sequence.settle_mode = match val.to_lowercase().as_str() {
            "fixed" => SettleMode::Fixed,
            "poll" => SettleMode::Poll,
            _ => {
                return Err(ConfigError::env_parse(
                    format!("{ENV_PREFIX}_SEQUENCE_SETTLE_MODE"),
                    "Expected 'fixed' or 'poll'",
                ))
            }
        };
    }

    // Harness overrides
    override_parsed(
        &format!("{ENV_PREFIX}_HARNESS_TIMEOUT_SECS"),
        &mut config.harness.timeout_secs,
        "timeout",
    )?;

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_LOGGING_LEVEL")) {
        config.logging.level = val;
    }

    Ok(())
}

/// Reject values that would make the run meaningless.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.modem.baud == 0 {
        return Err(ConfigError::validation("modem.baud", "must be positive"));
    }
    if config.sequence.sim_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "sequence.sim_timeout_ms",
            "must be positive",
        ));
    }
    if config.sequence.settle_mode == SettleMode::Poll && config.sequence.poll_interval_ms == 0 {
        return Err(ConfigError::validation(
            "sequence.poll_interval_ms",
            "must be positive in poll mode",
        ));
    }
    if config.harness.timeout_secs == 0 {
        return Err(ConfigError::validation(
            "harness.timeout_secs",
            "must be positive",
        ));
    }
    // An empty PIN counts as unset; the support gate reports it.
    if let Some(pin) = config.sim.pin.as_deref().filter(|p| !p.is_empty()) {
        if !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::validation("sim.pin", "must be digits only"));
        }
    }
    Ok(())
}
