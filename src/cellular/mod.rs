//! Cellular driver API consumed by the SIM test sequence.
//!
//! The sequence never reaches for a global modem instance. It is handed a
//! [`CellularStack`] and asks it for the context and device handles; a
//! missing handle comes back as `None` and is reported, not dereferenced.
//!
//! Two stacks ship with the crate: [`crate::driver::simulated`] for tests and
//! dry runs, and [`crate::driver::at`] for a modem on a serial port.

mod error;
mod types;

pub use error::{CellularError, CellularResult};
pub use types::{Imsi, SimState, IMSI_MAX_LEN};

use std::time::Duration;

/// Entry point to a driver stack.
#[cfg_attr(test, mockall::automock)]
pub trait CellularStack: Send {
    /// The network context used to bring the device up.
    fn default_context(&mut self) -> Option<Box<dyn CellularContext>>;

    /// The device whose SIM is exercised.
    fn default_device(&mut self) -> Option<Box<dyn CellularDevice>>;
}

/// Network context: owns the power-on to device-ready transition.
#[cfg_attr(test, mockall::automock)]
pub trait CellularContext: Send {
    /// Bring the modem to a state where SIM and network calls are valid.
    fn set_device_ready(&mut self) -> CellularResult<()>;
}

/// A modem device.
#[cfg_attr(test, mockall::automock)]
pub trait CellularDevice: Send {
    /// Open the SIM interface of this device.
    fn open_sim(&mut self) -> Option<Box<dyn CellularSim>>;

    /// Timeout applied to every subsequent modem operation.
    fn set_timeout(&mut self, timeout: Duration);

    /// Cheap liveness probe used while waiting for the SIM to settle.
    fn is_ready(&mut self) -> CellularResult<bool>;
}

/// SIM operations under test.
#[cfg_attr(test, mockall::automock)]
pub trait CellularSim: Send {
    /// Unlock the SIM with `pin`. Already unlocked counts as success.
    fn set_pin(&mut self, pin: &str) -> CellularResult<()>;

    /// Enable or disable the PIN requirement at power-on.
    fn set_pin_query(&mut self, pin: &str, query_pin: bool) -> CellularResult<()>;

    fn get_sim_state(&mut self) -> CellularResult<SimState>;

    fn get_imsi(&mut self) -> CellularResult<Imsi>;
}
