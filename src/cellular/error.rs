//! Result codes returned by the cellular driver API.

use crate::port::PortError;
use thiserror::Error;

/// Every non-OK outcome a driver call can report.
///
/// `Ok(())` plays the role of the driver's "OK" code; everything else is one
/// of these.
#[derive(Debug, Error)]
pub enum CellularError {
    /// The modem does not implement the requested operation.
    #[error("operation not supported by the modem")]
    Unsupported,

    /// The modem answered with a generic or unmapped error.
    #[error("device error{}", .0.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    DeviceError(Option<String>),

    /// No final result arrived within the operation timeout.
    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),

    /// The SIM rejected the credentials (wrong PIN, PIN/PUK required).
    #[error("SIM authentication failure")]
    AuthFailure,

    /// An argument was rejected before or by the modem.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// The modem is not reachable.
    #[error("no connection to the modem")]
    NoConnection,

    /// Another operation is holding the modem.
    #[error("modem busy")]
    Busy,

    /// The serial link failed underneath the driver.
    #[error("serial link error: {0}")]
    Port(#[from] PortError),
}

impl CellularError {
    pub fn device(detail: impl Into<String>) -> Self {
        Self::DeviceError(Some(detail.into()))
    }

    /// Short stable name used in logs and reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unsupported => "UNSUPPORTED",
            Self::DeviceError(_) => "DEVICE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::AuthFailure => "AUTH_FAILURE",
            Self::Parameter(_) => "PARAMETER",
            Self::NoConnection => "NO_CONNECTION",
            Self::Busy => "BUSY",
            Self::Port(_) => "PORT",
        }
    }
}

/// Result of a driver call.
pub type CellularResult<T> = Result<T, CellularError>;
