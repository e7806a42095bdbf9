//! AT channel errors and their mapping onto driver result codes.

use super::response::{ErrorCode, FinalResult};
use crate::cellular::CellularError;
use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtError {
    #[error("serial port: {0}")]
    Port(#[from] PortError),

    #[error("no final result within {0:?}")]
    Timeout(Duration),

    /// The modem terminated the command with something other than `OK`.
    #[error("command {command:?} failed: {result}")]
    Rejected { command: String, result: FinalResult },

    /// The response was complete but not in the expected shape.
    #[error("unexpected response to {command:?}: {detail}")]
    Malformed { command: String, detail: String },
}

pub type AtResult<T> = Result<T, AtError>;

impl From<AtError> for CellularError {
    fn from(err: AtError) -> Self {
        match err {
            AtError::Port(e) => CellularError::Port(e),
            AtError::Timeout(d) => CellularError::Timeout(d),
            AtError::Rejected { result, .. } => map_final_result(&result),
            AtError::Malformed { detail, .. } => CellularError::DeviceError(Some(detail)),
        }
    }
}

/// Map a failing final result onto a driver result code.
///
/// Numeric codes follow 3GPP TS 27.007 section 9.2.
pub fn map_final_result(result: &FinalResult) -> CellularError {
    match result {
        FinalResult::Ok => CellularError::device("OK reported as failure"),
        FinalResult::Error => CellularError::DeviceError(None),
        FinalResult::CmeError(ErrorCode::Numeric(code)) => match code {
            3 | 4 => CellularError::Unsupported,
            11 | 12 | 16 => CellularError::AuthFailure,
            50 => CellularError::Parameter(format!("+CME ERROR: {code}")),
            _ => CellularError::device(format!("+CME ERROR: {code}")),
        },
        FinalResult::CmeError(ErrorCode::Verbose(text)) => {
            let lower = text.to_ascii_lowercase();
            if lower.contains("not supported") || lower.contains("not allowed") {
                CellularError::Unsupported
            } else if lower.contains("incorrect password")
                || lower.contains("pin required")
                || lower.contains("puk required")
            {
                CellularError::AuthFailure
            } else {
                CellularError::device(format!("+CME ERROR: {text}"))
            }
        }
        FinalResult::CmsError(code) => CellularError::device(format!("+CMS ERROR: {code}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cme(n: u16) -> CellularError {
        map_final_result(&FinalResult::CmeError(ErrorCode::Numeric(n)))
    }

    #[test]
    fn test_unsupported_codes() {
        assert!(matches!(cme(3), CellularError::Unsupported));
        assert!(matches!(cme(4), CellularError::Unsupported));
    }

    #[test]
    fn test_auth_codes() {
        assert!(matches!(cme(11), CellularError::AuthFailure));
        assert!(matches!(cme(12), CellularError::AuthFailure));
        assert!(matches!(cme(16), CellularError::AuthFailure));
    }

    #[test]
    fn test_sim_faults_are_device_errors() {
        for code in [10, 13, 14, 15, 100] {
            assert!(matches!(cme(code), CellularError::DeviceError(Some(_))), "code {code}");
        }
        assert!(matches!(cme(50), CellularError::Parameter(_)));
    }

    #[test]
    fn test_verbose_codes() {
        let err = map_final_result(&FinalResult::CmeError(ErrorCode::Verbose(
            "operation not supported".into(),
        )));
        assert!(matches!(err, CellularError::Unsupported));

        let err = map_final_result(&FinalResult::CmeError(ErrorCode::Verbose(
            "incorrect password".into(),
        )));
        assert!(matches!(err, CellularError::AuthFailure));
    }

    #[test]
    fn test_plain_error_and_timeout() {
        assert!(matches!(
            map_final_result(&FinalResult::Error),
            CellularError::DeviceError(None)
        ));
        let err: CellularError = AtError::Timeout(Duration::from_secs(9)).into();
        assert!(matches!(err, CellularError::Timeout(d) if d == Duration::from_secs(9)));
    }
}
