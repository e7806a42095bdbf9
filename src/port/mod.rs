//! Port abstraction layer for the modem's serial link.
//!
//! Provides the `SerialPortAdapter` trait, a real port backed by `serialport`,
//! and a scripted mock used by the AT backend tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
