//! Shared test utilities for the SIM check tests.
//!
//! - Fixtures wired to a simulated or scripted modem
//! - A scripted AT modem that answers the full sequence
//! - Report helpers

#![allow(dead_code)]

use cellular_sim_check::cellular::CellularStack;
use cellular_sim_check::config::{HarnessConfig, SequenceConfig};
use cellular_sim_check::driver::SimulatedStack;
use cellular_sim_check::harness::{Harness, RunReport};
use cellular_sim_check::port::MockSerialPort;
use cellular_sim_check::sequence::{self, ManualClock, SimTestFixture};
use std::sync::Arc;

pub const PIN: &str = "1234";

/// Fixture over any stack, with a virtual clock so sequence waits cost nothing.
pub fn fixture(stack: impl CellularStack + 'static, pin: &str) -> (SimTestFixture, ManualClock) {
    let clock = ManualClock::new();
    let fixture = SimTestFixture::new(
        Box::new(stack),
        pin,
        SequenceConfig::default(),
        Arc::new(clock.clone()),
    );
    (fixture, clock)
}

/// Run the full two-case specification with default harness settings.
pub async fn run_sequence(stack: impl CellularStack + 'static, pin: &str) -> RunReport {
    let (fixture, _clock) = fixture(stack, pin);
    Harness::run(sequence::specification(&HarnessConfig::default()), fixture).await
}

/// A simulated modem whose SIM is locked with [`PIN`].
pub fn locked_modem() -> SimulatedStack {
    SimulatedStack::builder().pin(PIN).build()
}

/// A mock port answering every command of a successful run.
///
/// Bring-up probes, echo off and extended errors, then the SIM calls in the
/// order the sequence makes them.
pub fn scripted_modem(port_name: &str) -> MockSerialPort {
    let mut port = MockSerialPort::new(port_name);
    port.reply_to("AT\r", "\r\nOK\r\n");
    port.reply_to("ATE0\r", "ATE0\r\r\nOK\r\n");
    port.reply_to("AT+CMEE=1\r", "\r\nOK\r\n");
    port.reply_to("AT+CPIN?\r", "\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n");
    port.reply_to(format!("AT+CPIN=\"{PIN}\"\r"), "\r\nOK\r\n");
    port.reply_to(format!("AT+CLCK=\"SC\",0,\"{PIN}\"\r"), "\r\nOK\r\n");
    port.reply_to(format!("AT+CLCK=\"SC\",1,\"{PIN}\"\r"), "\r\nOK\r\n");
    port.reply_to("AT+CPIN?\r", "\r\n+CPIN: READY\r\n\r\nOK\r\n");
    port.reply_to("AT+CIMI\r", "\r\n001010123456789\r\n\r\nOK\r\n");
    port
}
