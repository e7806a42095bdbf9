//! In-memory driver stack.
//!
//! Behaves like a modem with a PIN-locked SIM: the SIM reports `PinNeeded`
//! until the right PIN is submitted, three wrong PINs block it behind the
//! PUK, and every call is recorded so tests can check what the sequence
//! actually did. Faults are injected through the builder.

use crate::cellular::{
    CellularContext, CellularDevice, CellularError, CellularResult, CellularSim, CellularStack,
    Imsi, SimState, IMSI_MAX_LEN,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// IMSI on the 3GPP test network (MCC 001, MNC 01).
pub const TEST_IMSI: &str = "001010123456789";

/// PIN attempts before the SIM blocks.
const PIN_ATTEMPTS: u8 = 3;

/// A failure the simulated modem can be told to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Unsupported,
    DeviceError,
    Timeout,
    AuthFailure,
    NoConnection,
    Busy,
}

impl Fault {
    fn to_error(self) -> CellularError {
        match self {
            Self::Unsupported => CellularError::Unsupported,
            Self::DeviceError => CellularError::device("injected fault"),
            Self::Timeout => CellularError::Timeout(Duration::from_secs(9)),
            Self::AuthFailure => CellularError::AuthFailure,
            Self::NoConnection => CellularError::NoConnection,
            Self::Busy => CellularError::Busy,
        }
    }
}

/// One call made against the simulated stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    DefaultContext,
    DefaultDevice,
    SetDeviceReady,
    OpenSim,
    SetTimeout(Duration),
    IsReady,
    SetPin(String),
    SetPinQuery { query_pin: bool },
    GetSimState,
    GetImsi,
}

#[derive(Debug, Clone)]
struct Behaviour {
    has_context: bool,
    has_device: bool,
    has_sim: bool,
    pin: String,
    imsi: String,
    device_ready: Option<Fault>,
    set_pin: Option<Fault>,
    pin_query: Option<Fault>,
    sim_state: Option<Fault>,
    get_imsi: Option<Fault>,
    reported_state: Option<SimState>,
    busy_polls: u32,
}

#[derive(Debug)]
struct ModemState {
    behaviour: Behaviour,
    locked: bool,
    attempts_left: u8,
    pin_query_enabled: bool,
    polls: u32,
    calls: Vec<SimCall>,
}

type Shared = Arc<Mutex<ModemState>>;

/// Builder for [`SimulatedStack`].
#[derive(Debug, Clone)]
pub struct SimulatedStackBuilder {
    behaviour: Behaviour,
    locked: bool,
}

impl Default for SimulatedStackBuilder {
    fn default() -> Self {
        Self {
            behaviour: Behaviour {
                has_context: true,
                has_device: true,
                has_sim: true,
                pin: "1234".to_string(),
                imsi: TEST_IMSI.to_string(),
                device_ready: None,
                set_pin: None,
                pin_query: None,
                sim_state: None,
                get_imsi: None,
                reported_state: None,
                busy_polls: 0,
            },
            locked: true,
        }
    }
}

impl SimulatedStackBuilder {
    /// The PIN the SIM accepts.
    pub fn pin(mut self, pin: impl Into<String>) -> Self {
        self.behaviour.pin = pin.into();
        self
    }

    pub fn imsi(mut self, imsi: impl Into<String>) -> Self {
        self.behaviour.imsi = imsi.into();
        self
    }

    /// Start with the SIM already unlocked.
    pub fn unlocked(mut self) -> Self {
        self.locked = false;
        self
    }

    /// `default_context()` returns no handle.
    pub fn without_context(mut self) -> Self {
        self.behaviour.has_context = false;
        self
    }

    /// `default_device()` returns no handle.
    pub fn without_device(mut self) -> Self {
        self.behaviour.has_device = false;
        self
    }

    /// `open_sim()` returns no handle.
    pub fn without_sim(mut self) -> Self {
        self.behaviour.has_sim = false;
        self
    }

    pub fn fail_device_ready(mut self, fault: Fault) -> Self {
        self.behaviour.device_ready = Some(fault);
        self
    }

    pub fn fail_set_pin(mut self, fault: Fault) -> Self {
        self.behaviour.set_pin = Some(fault);
        self
    }

    /// Both PIN-query calls report `fault`; `Fault::Unsupported` models a
    /// modem without facility lock support.
    pub fn fail_pin_query(mut self, fault: Fault) -> Self {
        self.behaviour.pin_query = Some(fault);
        self
    }

    pub fn fail_sim_state(mut self, fault: Fault) -> Self {
        self.behaviour.sim_state = Some(fault);
        self
    }

    pub fn fail_imsi(mut self, fault: Fault) -> Self {
        self.behaviour.get_imsi = Some(fault);
        self
    }

    /// Report `state` from `get_sim_state` whatever the lock says.
    pub fn report_state(mut self, state: SimState) -> Self {
        self.behaviour.reported_state = Some(state);
        self
    }

    /// `is_ready()` answers false this many times before answering true.
    pub fn busy_for_polls(mut self, polls: u32) -> Self {
        self.behaviour.busy_polls = polls;
        self
    }

    pub fn build(self) -> SimulatedStack {
        SimulatedStack {
            state: Arc::new(Mutex::new(ModemState {
                behaviour: self.behaviour,
                locked: self.locked,
                attempts_left: PIN_ATTEMPTS,
                pin_query_enabled: true,
                polls: 0,
                calls: Vec::new(),
            })),
        }
    }
}

/// Simulated driver stack. Clones observe the same modem.
#[derive(Debug, Clone)]
pub struct SimulatedStack {
    state: Shared,
}

impl Default for SimulatedStack {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SimulatedStack {
    pub fn builder() -> SimulatedStackBuilder {
        SimulatedStackBuilder::default()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().calls.clone()
    }

    pub fn pin_query_enabled(&self) -> bool {
        self.state.lock().pin_query_enabled
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }
}

fn record(state: &Shared, call: SimCall) -> parking_lot::MutexGuard<'_, ModemState> {
    let mut guard = state.lock();
    guard.calls.push(call);
    guard
}

impl CellularStack for SimulatedStack {
    fn default_context(&mut self) -> Option<Box<dyn CellularContext>> {
        let guard = record(&self.state, SimCall::DefaultContext);
        if !guard.behaviour.has_context {
            return None;
        }
        Some(Box::new(SimulatedContext {
            state: Arc::clone(&self.state),
        }))
    }

    fn default_device(&mut self) -> Option<Box<dyn CellularDevice>> {
        let guard = record(&self.state, SimCall::DefaultDevice);
        if !guard.behaviour.has_device {
            return None;
        }
        Some(Box::new(SimulatedDevice {
            state: Arc::clone(&self.state),
        }))
    }
}

struct SimulatedContext {
    state: Shared,
}

impl CellularContext for SimulatedContext {
    fn set_device_ready(&mut self) -> CellularResult<()> {
        let guard = record(&self.state, SimCall::SetDeviceReady);
        match guard.behaviour.device_ready {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }
}

struct SimulatedDevice {
    state: Shared,
}

impl CellularDevice for SimulatedDevice {
    fn open_sim(&mut self) -> Option<Box<dyn CellularSim>> {
        let guard = record(&self.state, SimCall::OpenSim);
        if !guard.behaviour.has_sim {
            return None;
        }
        Some(Box::new(SimulatedSim {
            state: Arc::clone(&self.state),
        }))
    }

    fn set_timeout(&mut self, timeout: Duration) {
        record(&self.state, SimCall::SetTimeout(timeout));
    }

    fn is_ready(&mut self) -> CellularResult<bool> {
        let mut guard = record(&self.state, SimCall::IsReady);
        guard.polls += 1;
        Ok(guard.polls > guard.behaviour.busy_polls)
    }
}

struct SimulatedSim {
    state: Shared,
}

impl CellularSim for SimulatedSim {
    fn set_pin(&mut self, pin: &str) -> CellularResult<()> {
        let mut guard = record(&self.state, SimCall::SetPin(pin.to_string()));
        if let Some(fault) = guard.behaviour.set_pin {
            return Err(fault.to_error());
        }
        if !guard.locked {
            return Ok(());
        }
        if guard.attempts_left == 0 {
            return Err(CellularError::AuthFailure);
        }
        if pin == guard.behaviour.pin {
            guard.locked = false;
            guard.attempts_left = PIN_ATTEMPTS;
            Ok(())
        } else {
            guard.attempts_left -= 1;
            Err(CellularError::AuthFailure)
        }
    }

    fn set_pin_query(&mut self, pin: &str, query_pin: bool) -> CellularResult<()> {
        let mut guard = record(&self.state, SimCall::SetPinQuery { query_pin });
        if let Some(fault) = guard.behaviour.pin_query {
            return Err(fault.to_error());
        }
        if pin != guard.behaviour.pin {
            return Err(CellularError::AuthFailure);
        }
        guard.pin_query_enabled = query_pin;
        Ok(())
    }

    fn get_sim_state(&mut self) -> CellularResult<SimState> {
        let guard = record(&self.state, SimCall::GetSimState);
        if let Some(fault) = guard.behaviour.sim_state {
            return Err(fault.to_error());
        }
        if let Some(state) = guard.behaviour.reported_state {
            return Ok(state);
        }
        Ok(if guard.attempts_left == 0 {
            SimState::PukNeeded
        } else if guard.locked {
            SimState::PinNeeded
        } else {
            SimState::Ready
        })
    }

    fn get_imsi(&mut self) -> CellularResult<Imsi> {
        let guard = record(&self.state, SimCall::GetImsi);
        if let Some(fault) = guard.behaviour.get_imsi {
            return Err(fault.to_error());
        }
        if guard.locked {
            return Err(CellularError::AuthFailure);
        }
        Imsi::new(guard.behaviour.imsi.clone()).map_err(|_| {
            CellularError::device(format!("IMSI exceeds {IMSI_MAX_LEN} characters"))
        })
    }
}
