use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// A `Result` for everything the runner does before and after the harness.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that stop the runner before a report exists.
///
/// Case failures are not errors at this level; they live in the
/// [`crate::harness::RunReport`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot open modem port: {0}")]
    Port(#[from] PortError),

    #[error("cannot render report: {0}")]
    Report(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit status; always distinct from a failed run.
    pub fn exit_code(&self) -> u8 {
        2
    }
}
