//! AT response framing and final result codes.

use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EXTENDED_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+CM([ES]) ERROR:\s*(.+)$").expect("static regex is valid")
});

/// Payload of a `+CME ERROR` / `+CMS ERROR` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// `AT+CMEE=1` style.
    Numeric(u16),
    /// `AT+CMEE=2` style.
    Verbose(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Verbose(s) => f.write_str(s),
        }
    }
}

/// The line that terminates a command's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalResult {
    Ok,
    Error,
    CmeError(ErrorCode),
    CmsError(ErrorCode),
}

impl FinalResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for FinalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Error => f.write_str("ERROR"),
            Self::CmeError(code) => write!(f, "+CME ERROR: {code}"),
            Self::CmsError(code) => write!(f, "+CMS ERROR: {code}"),
        }
    }
}

/// Classify a line as a final result code, or `None` for information text.
pub fn parse_final(line: &str) -> Option<FinalResult> {
    match line {
        "OK" => return Some(FinalResult::Ok),
        "ERROR" => return Some(FinalResult::Error),
        _ => {}
    }

    let caps = EXTENDED_ERROR.captures(line)?;
    let payload = caps[2].trim();
    let code = match payload.parse::<u16>() {
        Ok(n) => ErrorCode::Numeric(n),
        Err(_) => ErrorCode::Verbose(payload.to_string()),
    };
    match &caps[1] {
        "E" => Some(FinalResult::CmeError(code)),
        _ => Some(FinalResult::CmsError(code)),
    }
}

/// A completed response: information lines plus the final result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtResponse {
    pub lines: Vec<String>,
    pub result: FinalResult,
}

impl AtResponse {
    /// Value of the first `<prefix>: <value>` line, with the prefix stripped.
    pub fn prefixed(&self, prefix: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            line.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::trim)
        })
    }

    /// First information line that is not a `+XXX:` URC.
    pub fn first_plain_line(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .find(|line| !line.starts_with('+'))
    }
}

/// Accumulates raw bytes from the port and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Next `\n`-terminated line with trailing `\r` removed.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = memchr(b'\n', &self.buf)?;
        let raw: Vec<u8> = self.buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\r', '\n']).trim().to_string())
    }
}
