//! Driver stacks implementing the [`crate::cellular`] traits.

pub mod at;
pub mod simulated;

pub use at::AtCellularStack;
pub use simulated::{Fault, SimCall, SimulatedStack, SimulatedStackBuilder, TEST_IMSI};
