//! Driver stack for a modem reached over a serial port with AT commands.
//!
//! Context, device and SIM handles share one [`AtChannel`]; each command
//! takes the lock for the duration of its exchange only.

use crate::at::{AtChannel, AtError};
use crate::cellular::{
    CellularContext, CellularDevice, CellularError, CellularResult, CellularSim, CellularStack,
    Imsi, SimState, IMSI_MAX_LEN,
};
use crate::port::SerialPortAdapter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

type SharedChannel<P> = Arc<Mutex<AtChannel<P>>>;

/// How long to keep probing a booting modem before giving up.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between `AT` probes during bring-up.
const READY_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Map a `+CPIN:` value onto a SIM state.
pub fn parse_sim_state(value: &str) -> SimState {
    match value.trim() {
        "READY" => SimState::Ready,
        "SIM PIN" => SimState::PinNeeded,
        "SIM PUK" => SimState::PukNeeded,
        _ => SimState::Unknown,
    }
}

fn check_pin(pin: &str) -> CellularResult<()> {
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CellularError::Parameter(
            "PIN must be a non-empty string of digits".to_string(),
        ));
    }
    Ok(())
}

/// Stack entry point for an AT modem.
pub struct AtCellularStack<P: SerialPortAdapter> {
    channel: SharedChannel<P>,
    ready_timeout: Duration,
}

impl<P: SerialPortAdapter + 'static> AtCellularStack<P> {
    pub fn new(port: P) -> Self {
        Self {
            channel: Arc::new(Mutex::new(AtChannel::new(port))),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Window in which the modem must start answering `AT`.
    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }
}

impl<P: SerialPortAdapter + 'static> CellularStack for AtCellularStack<P> {
    fn default_context(&mut self) -> Option<Box<dyn CellularContext>> {
        Some(Box::new(AtContext {
            channel: Arc::clone(&self.channel),
            ready_timeout: self.ready_timeout,
        }))
    }

    fn default_device(&mut self) -> Option<Box<dyn CellularDevice>> {
        Some(Box::new(AtDevice {
            channel: Arc::clone(&self.channel),
        }))
    }
}

struct AtContext<P: SerialPortAdapter> {
    channel: SharedChannel<P>,
    ready_timeout: Duration,
}

impl<P: SerialPortAdapter> AtContext<P> {
    fn wait_for_at(&self) -> CellularResult<()> {
        let deadline = Instant::now() + self.ready_timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = self.channel.lock().command("AT");
            match result {
                Ok(_) => {
                    debug!(attempts, "modem answered AT");
                    return Ok(());
                }
                Err(AtError::Timeout(_)) | Err(AtError::Rejected { .. })
                    if Instant::now() < deadline =>
                {
                    std::thread::sleep(READY_PROBE_INTERVAL);
                }
                Err(AtError::Timeout(_)) => {
                    warn!(attempts, "modem never answered AT");
                    return Err(CellularError::NoConnection);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<P: SerialPortAdapter> CellularContext for AtContext<P> {
    fn set_device_ready(&mut self) -> CellularResult<()> {
        self.wait_for_at()?;
        let mut at = self.channel.lock();
        at.command("ATE0")?;
        at.command("AT+CMEE=1")?;
        info!(port = %at.port_name(), "device ready");
        Ok(())
    }
}

struct AtDevice<P: SerialPortAdapter> {
    channel: SharedChannel<P>,
}

impl<P: SerialPortAdapter + 'static> CellularDevice for AtDevice<P> {
    fn open_sim(&mut self) -> Option<Box<dyn CellularSim>> {
        Some(Box::new(AtSim {
            channel: Arc::clone(&self.channel),
        }))
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.channel.lock().set_timeout(timeout);
    }

    fn is_ready(&mut self) -> CellularResult<bool> {
        match self.channel.lock().command("AT") {
            Ok(_) => Ok(true),
            Err(AtError::Timeout(_)) | Err(AtError::Rejected { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

struct AtSim<P: SerialPortAdapter> {
    channel: SharedChannel<P>,
}

impl<P: SerialPortAdapter> AtSim<P> {
    fn query_state(&self) -> CellularResult<SimState> {
        let resp = self.channel.lock().command("AT+CPIN?")?;
        let value = resp.prefixed("+CPIN").ok_or_else(|| AtError::Malformed {
            command: "AT+CPIN?".to_string(),
            detail: "missing +CPIN line".to_string(),
        })?;
        Ok(parse_sim_state(value))
    }
}

impl<P: SerialPortAdapter> CellularSim for AtSim<P> {
    fn set_pin(&mut self, pin: &str) -> CellularResult<()> {
        check_pin(pin)?;
        if self.query_state()? == SimState::Ready {
            debug!("SIM already unlocked");
            return Ok(());
        }
        self.channel.lock().command(&format!("AT+CPIN=\"{pin}\""))?;
        Ok(())
    }

    fn set_pin_query(&mut self, pin: &str, query_pin: bool) -> CellularResult<()> {
        check_pin(pin)?;
        let mode = if query_pin { 1 } else { 0 };
        self.channel
            .lock()
            .command(&format!("AT+CLCK=\"SC\",{mode},\"{pin}\""))?;
        Ok(())
    }

    fn get_sim_state(&mut self) -> CellularResult<SimState> {
        self.query_state()
    }

    fn get_imsi(&mut self) -> CellularResult<Imsi> {
        let resp = self.channel.lock().command("AT+CIMI")?;
        let raw = resp
            .prefixed("+CIMI")
            .or_else(|| resp.first_plain_line())
            .unwrap_or_default();
        Imsi::new(raw).map_err(|value| {
            CellularError::device(format!(
                "IMSI of {} characters exceeds {IMSI_MAX_LEN}",
                value.len()
            ))
        })
    }
}
