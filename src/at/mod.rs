//! Minimal AT command channel.
//!
//! Sends one command at a time and collects its response up to the final
//! result code. Only what the SIM checks need is here: no URC dispatch, no
//! multiplexing, no data mode.

mod error;
mod response;

pub use error::{map_final_result, AtError, AtResult};
pub use response::{parse_final, AtResponse, ErrorCode, FinalResult, LineBuffer};

use crate::port::SerialPortAdapter;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Response timeout used until the device sets its own.
pub const DEFAULT_AT_TIMEOUT: Duration = Duration::from_secs(1);

/// Sleep between reads while the port has nothing for us.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// A command/response channel over a serial port.
#[derive(Debug)]
pub struct AtChannel<P: SerialPortAdapter> {
    port: P,
    buffer: LineBuffer,
    timeout: Duration,
}

impl<P: SerialPortAdapter> AtChannel<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            buffer: LineBuffer::new(),
            timeout: DEFAULT_AT_TIMEOUT,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Response timeout for subsequent commands.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Send `command` and wait for `OK`.
    ///
    /// Any other final result becomes [`AtError::Rejected`].
    pub fn command(&mut self, command: &str) -> AtResult<AtResponse> {
        let response = self.exchange(command)?;
        if response.result.is_ok() {
            Ok(response)
        } else {
            Err(AtError::Rejected {
                command: command.to_string(),
                result: response.result,
            })
        }
    }

    /// Send `command` and return whatever final result it produced.
    pub fn exchange(&mut self, command: &str) -> AtResult<AtResponse> {
        self.port.clear_buffers()?;
        self.buffer.clear();

        debug!(port = %self.port.name(), command = %redact(command), "AT send");
        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(b'\r');
        self.port.write_bytes(&frame)?;

        let response = self.read_response(command)?;
        debug!(
            port = %self.port.name(),
            command = %redact(command),
            result = %response.result,
            lines = response.lines.len(),
            "AT done"
        );
        Ok(response)
    }

    fn read_response(&mut self, command: &str) -> AtResult<AtResponse> {
        let deadline = Instant::now() + self.timeout;
        let mut lines = Vec::new();
        let mut chunk = [0u8; 256];

        loop {
            while let Some(line) = self.buffer.next_line() {
                if line.is_empty() || line == command {
                    continue;
                }
                if let Some(result) = parse_final(&line) {
                    return Ok(AtResponse { lines, result });
                }
                trace!(line = %redact_info(command, &line), "AT info");
                lines.push(line);
            }

            if Instant::now() >= deadline {
                return Err(AtError::Timeout(self.timeout));
            }

            match self.port.read_bytes(&mut chunk) {
                Ok(0) => std::thread::sleep(IDLE_POLL),
                Ok(n) => self.buffer.extend(&chunk[..n]),
                Err(e) if e.is_transient() => std::thread::sleep(IDLE_POLL),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Keep PINs out of the logs.
fn redact(command: &str) -> String {
    let upper = command.to_ascii_uppercase();
    if upper.starts_with("AT+CPIN=") || upper.starts_with("AT+CLCK=") {
        match command.find('=') {
            Some(idx) => format!("{}=<redacted>", &command[..idx]),
            None => command.to_string(),
        }
    } else {
        command.to_string()
    }
}

/// Keep subscriber identities out of the logs; only their length is shown.
fn redact_info(command: &str, line: &str) -> String {
    if command.eq_ignore_ascii_case("AT+CIMI") {
        format!("<{} chars redacted>", line.len())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;

    fn channel() -> (AtChannel<MockSerialPort>, MockSerialPort) {
        let port = MockSerialPort::new("MOCK0");
        let mut channel = AtChannel::new(port.clone());
        channel.set_timeout(Duration::from_millis(50));
        (channel, port)
    }

    #[test]
    fn test_command_ok_collects_info_lines() {
        let (mut at, mut port) = channel();
        port.reply_to("AT+CPIN?\r", "AT+CPIN?\r\r\n+CPIN: READY\r\n\r\nOK\r\n");

        let resp = at.command("AT+CPIN?").unwrap();
        assert_eq!(resp.lines, vec!["+CPIN: READY".to_string()]);
        assert_eq!(resp.prefixed("+CPIN"), Some("READY"));
        assert!(port.was_cleared());
    }

    #[test]
    fn test_rejected_command() {
        let (mut at, mut port) = channel();
        port.reply_to("AT+CLCK=\"SC\",0,\"1234\"\r", "\r\n+CME ERROR: 4\r\n");

        match at.command("AT+CLCK=\"SC\",0,\"1234\"") {
            Err(AtError::Rejected { result, .. }) => {
                assert_eq!(result, FinalResult::CmeError(ErrorCode::Numeric(4)))
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_exchange_returns_error_result_without_failing() {
        let (mut at, mut port) = channel();
        port.reply_to("AT+FOO\r", "\r\nERROR\r\n");

        let resp = at.exchange("AT+FOO").unwrap();
        assert_eq!(resp.result, FinalResult::Error);
    }

    #[test]
    fn test_silent_modem_times_out() {
        let (mut at, _port) = channel();
        match at.command("AT") {
            Err(AtError::Timeout(d)) => assert_eq!(d, Duration::from_millis(50)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_hard_port_error_propagates() {
        let (mut at, mut port) = channel();
        port.set_disconnected(true);
        assert!(matches!(at.command("AT"), Err(AtError::Port(_))));
    }

    #[test]
    fn test_redact_hides_pin() {
        assert_eq!(redact("AT+CPIN=\"1234\""), "AT+CPIN=<redacted>");
        assert_eq!(redact("AT+CLCK=\"SC\",1,\"1234\""), "AT+CLCK=<redacted>");
        assert_eq!(redact("AT+CPIN?"), "AT+CPIN?");
    }

    #[test]
    fn test_imsi_answer_is_not_logged() {
        assert_eq!(
            redact_info("AT+CIMI", "001010123456789"),
            "<15 chars redacted>"
        );
        assert_eq!(redact_info("AT+CPIN?", "+CPIN: READY"), "+CPIN: READY");
    }
}
