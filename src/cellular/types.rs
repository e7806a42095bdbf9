//! Value types exchanged with the driver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest IMSI the standard allows (MCC + MNC + MSIN).
pub const IMSI_MAX_LEN: usize = 15;

/// SIM readiness as reported by the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    /// Unlocked and usable.
    Ready,
    /// Waiting for the PIN.
    PinNeeded,
    /// Blocked; waiting for the PUK.
    PukNeeded,
    /// Anything else, including a missing SIM.
    Unknown,
}

impl fmt::Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::PinNeeded => "pin needed",
            Self::PukNeeded => "puk needed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Subscriber identity read from the SIM.
///
/// Construction enforces the 15 character bound; emptiness is allowed so the
/// caller can decide what an empty answer means.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Imsi(String);

impl Imsi {
    /// Wrap an identity, rejecting anything over [`IMSI_MAX_LEN`].
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.len() > IMSI_MAX_LEN {
            return Err(value);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the identity is all digits, as a well-formed IMSI is.
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for Imsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
