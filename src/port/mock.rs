//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that behaves like a modem on the other end of
//! a UART: replies can be scripted per command, so an AT exchange can be
//! exercised without hardware.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes waiting to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Every write, in order.
    write_log: Vec<Vec<u8>>,
    /// Scripted replies: the first entry whose command matches a write is
    /// consumed and its reply appended to the read queue.
    replies: VecDeque<(Vec<u8>, Vec<u8>)>,
    /// Whether the next operation should time out.
    should_timeout: bool,
    /// Whether the port behaves as if the cable was pulled.
    disconnected: bool,
    buffers_cleared: bool,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the backend owns the other.
///
/// # Example
/// ```
/// use cellular_sim_check::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.reply_to("AT\r", "\r\nOK\r\n");
///
/// port.write_bytes(b"AT\r").unwrap();
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"\r\nOK\r\n");
/// assert_eq!(port.get_write_log(), vec![b"AT\r".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Script the reply the "modem" sends when `command` is written.
    ///
    /// Replies for the same command are consumed in the order they were
    /// scripted, so a command issued twice can get two different answers.
    pub fn reply_to(&mut self, command: impl AsRef<[u8]>, reply: impl AsRef<[u8]>) {
        self.state
            .lock()
            .replies
            .push_back((command.as_ref().to_vec(), reply.as_ref().to_vec()));
    }

    /// Number of scripted replies that have not been triggered yet.
    pub fn pending_replies(&self) -> usize {
        self.state.lock().replies.len()
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All writes decoded as text with line terminators trimmed.
    pub fn written_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .write_log
            .iter()
            .map(|w| String::from_utf8_lossy(w).trim_end().to_string())
            .collect()
    }

    /// Set whether the next read/write operation should time out.
    pub fn set_should_timeout(&mut self, should_timeout: bool) {
        self.state.lock().should_timeout = should_timeout;
    }

    /// Make every subsequent operation fail as if the device vanished.
    pub fn set_disconnected(&mut self, disconnected: bool) {
        self.state.lock().disconnected = disconnected;
    }

    /// Get whether buffers have been cleared at least once.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn check_faults(state: &mut MockPortState) -> Result<(), PortError> {
        if state.disconnected {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }
        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(Duration::from_millis(100)));
        }
        Ok(())
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        Self::check_faults(&mut state)?;

        state.write_log.push(data.to_vec());

        if let Some(idx) = state.replies.iter().position(|(cmd, _)| cmd == data) {
            if let Some((_, reply)) = state.replies.remove(idx) {
                state.read_queue.extend(reply);
            }
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        Self::check_faults(&mut state)?;

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .field("pending_replies", &self.pending_replies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"+CPIN: READY");

        let mut buffer = [0u8; 32];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"+CPIN: READY");
    }

    #[test]
    fn test_scripted_reply_only_after_matching_write() {
        let mut port = MockSerialPort::new("MOCK0");
        port.reply_to("AT+CIMI\r", "\r\n001010123456789\r\n\r\nOK\r\n");

        port.write_bytes(b"AT\r").unwrap();
        assert_eq!(port.available_bytes(), 0);
        assert_eq!(port.pending_replies(), 1);

        port.write_bytes(b"AT+CIMI\r").unwrap();
        assert_eq!(port.pending_replies(), 0);
        assert!(port.available_bytes() > 0);
    }

    #[test]
    fn test_repeated_command_gets_replies_in_order() {
        let mut port = MockSerialPort::new("MOCK0");
        port.reply_to("AT+CPIN?\r", "A");
        port.reply_to("AT+CPIN?\r", "B");

        let mut buffer = [0u8; 4];
        port.write_bytes(b"AT+CPIN?\r").unwrap();
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"A");

        port.write_bytes(b"AT+CPIN?\r").unwrap();
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"B");
    }

    #[test]
    fn test_written_commands_are_trimmed() {
        let mut port = MockSerialPort::new("MOCK0");
        port.write_bytes(b"ATE0\r").unwrap();
        assert_eq!(port.written_commands(), vec!["ATE0".to_string()]);
    }

    #[test]
    fn test_timeout_simulation() {
        let mut port = MockSerialPort::new("MOCK0");
        port.set_should_timeout(true);

        let mut buffer = [0u8; 10];
        let result = port.read_bytes(&mut buffer);
        assert!(matches!(result, Err(PortError::Timeout(_))));

        // one-shot
        port.enqueue_read(b"x");
        assert!(port.read_bytes(&mut buffer).is_ok());
    }

    #[test]
    fn test_disconnected_port_fails_hard() {
        let mut port = MockSerialPort::new("MOCK0");
        port.set_disconnected(true);

        let err = port.write_bytes(b"AT\r").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_clear_buffers() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"stale URC");

        port.clear_buffers().unwrap();
        assert!(port.was_cleared());
        assert_eq!(port.available_bytes(), 0);
    }

    #[test]
    fn test_empty_read_would_block() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut buffer = [0u8; 10];

        match port.read_bytes(&mut buffer) {
            Err(PortError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::WouldBlock),
            other => panic!("Expected WouldBlock error, got {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_state() {
        let mut port = MockSerialPort::new("MOCK0");
        let observer = port.clone();
        port.write_bytes(b"AT\r").unwrap();
        assert_eq!(observer.get_write_log().len(), 1);
    }
}
