//! Cellular SIM check library
//!
//! Hardware-in-the-loop check of a cellular modem's SIM interface: bring the
//! device up, unlock the SIM, toggle the PIN query, and confirm the SIM is
//! ready and reports an IMSI.
//!
//! # Modules
//!
//! - `cellular`: Driver API the sequence runs against (stack, context, device, SIM)
//! - `driver`: Simulated stack and an AT-command stack over a serial port
//! - `at`: AT command channel and response parsing
//! - `port`: Serial port abstraction
//! - `sequence`: The two test cases and their fixture
//! - `harness`: Ordered case runner with a global timeout and run report
//! - `config`: Configuration management with TOML support
//! - `error`: Top-level error type for the runner

pub mod at;
pub mod cellular;
pub mod config;
pub mod driver;
pub mod error;
pub mod harness;
pub mod port;
pub mod sequence;

// Re-export commonly used types for convenience
pub use cellular::{
    CellularContext, CellularDevice, CellularError, CellularResult, CellularSim, CellularStack,
    Imsi, SimState,
};
pub use driver::{AtCellularStack, SimulatedStack};
pub use error::{AppError, AppResult};
pub use harness::{
    Case, CaseFailure, CaseOutcome, CaseResult, FailureKind, Harness, RunReport, Specification,
};
pub use port::{MockSerialPort, PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};
pub use sequence::{specification, SimTestFixture};

// Re-export config types
pub use config::{Backend, Config, ConfigError, ConfigLoader, ConfigResult, NotSupported};
