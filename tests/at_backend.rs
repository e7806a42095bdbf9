//! The SIM sequence over the AT backend, with a scripted modem on a mock port.

mod common;

use cellular_sim_check::cellular::{CellularError, CellularStack, SimState};
use cellular_sim_check::config::HarnessConfig;
use cellular_sim_check::driver::AtCellularStack;
use cellular_sim_check::harness::{CaseOutcome, FailureKind, Harness};
use cellular_sim_check::port::MockSerialPort;
use cellular_sim_check::sequence::{self, INIT_CASE, INTERFACE_CASE};
use common::{scripted_modem, PIN};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn at_stack(port: &MockSerialPort) -> AtCellularStack<MockSerialPort> {
    AtCellularStack::new(port.clone()).with_ready_timeout(Duration::from_millis(200))
}

#[tokio::test]
async fn full_sequence_over_at_passes() {
    let port = scripted_modem("MOCK_MODEM");
    let (fixture, _clock) = common::fixture(at_stack(&port), PIN);

    let report = Harness::run(sequence::specification(&HarnessConfig::default()), fixture).await;

    assert!(report.passed(), "{}", report.summary());
    assert_eq!(port.pending_replies(), 0);
    assert_eq!(
        port.written_commands(),
        vec![
            "AT",
            "ATE0",
            "AT+CMEE=1",
            "AT+CPIN?",
            "AT+CPIN=\"1234\"",
            "AT+CLCK=\"SC\",0,\"1234\"",
            "AT+CLCK=\"SC\",1,\"1234\"",
            "AT+CPIN?",
            "AT+CIMI",
        ]
    );
}

#[tokio::test]
async fn silent_modem_aborts_bring_up() {
    let port = MockSerialPort::new("MOCK_MODEM");
    let (fixture, _clock) = common::fixture(at_stack(&port), PIN);

    let report = Harness::run(sequence::specification(&HarnessConfig::default()), fixture).await;

    assert_eq!(report.case(INIT_CASE).unwrap().outcome, CaseOutcome::Aborted);
    assert_eq!(report.case(INTERFACE_CASE).unwrap().outcome, CaseOutcome::Skipped);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn facility_lock_not_supported_is_accepted() {
    let mut port = MockSerialPort::new("MOCK_MODEM");
    port.reply_to("AT\r", "\r\nOK\r\n");
    port.reply_to("ATE0\r", "\r\nOK\r\n");
    port.reply_to("AT+CMEE=1\r", "\r\nOK\r\n");
    port.reply_to("AT+CPIN?\r", "\r\n+CPIN: READY\r\n\r\nOK\r\n");
    port.reply_to("AT+CLCK=\"SC\",0,\"1234\"\r", "\r\n+CME ERROR: 4\r\n");
    port.reply_to("AT+CLCK=\"SC\",1,\"1234\"\r", "\r\n+CME ERROR: 4\r\n");
    port.reply_to("AT+CPIN?\r", "\r\n+CPIN: READY\r\n\r\nOK\r\n");
    port.reply_to("AT+CIMI\r", "\r\n001010123456789\r\n\r\nOK\r\n");
    let (fixture, _clock) = common::fixture(at_stack(&port), PIN);

    let report = Harness::run(sequence::specification(&HarnessConfig::default()), fixture).await;

    assert!(report.passed(), "{}", report.summary());
    // Already unlocked: no AT+CPIN= was sent.
    assert!(!port
        .written_commands()
        .iter()
        .any(|c| c.starts_with("AT+CPIN=")));
}

#[tokio::test]
async fn incorrect_pin_fails_the_interface_case() {
    let mut port = MockSerialPort::new("MOCK_MODEM");
    port.reply_to("AT\r", "\r\nOK\r\n");
    port.reply_to("ATE0\r", "\r\nOK\r\n");
    port.reply_to("AT+CMEE=1\r", "\r\nOK\r\n");
    port.reply_to("AT+CPIN?\r", "\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n");
    port.reply_to("AT+CPIN=\"1234\"\r", "\r\n+CME ERROR: 16\r\n");
    let (fixture, _clock) = common::fixture(at_stack(&port), PIN);

    let report = Harness::run(sequence::specification(&HarnessConfig::default()), fixture).await;

    let failure = report.case(INTERFACE_CASE).unwrap().failure.clone().unwrap();
    assert_eq!(failure.kind, FailureKind::Operation);
    assert!(failure.message.contains("AUTH_FAILURE"));
    assert!(!port.written_commands().iter().any(|c| c.starts_with("AT+CLCK")));
}

#[test]
fn sim_state_and_imsi_over_at() {
    let mut port = MockSerialPort::new("MOCK_MODEM");
    port.reply_to("AT+CPIN?\r", "\r\n+CPIN: SIM PUK\r\n\r\nOK\r\n");
    port.reply_to("AT+CIMI\r", "\r\n+CME ERROR: 10\r\n");

    let mut stack = at_stack(&port);
    let mut device = stack.default_device().unwrap();
    device.set_timeout(Duration::from_millis(200));
    let mut sim = device.open_sim().unwrap();

    assert_eq!(sim.get_sim_state().unwrap(), SimState::PukNeeded);
    assert!(matches!(sim.get_imsi(), Err(CellularError::DeviceError(_))));
}

#[test]
fn pin_is_validated_before_anything_is_sent() {
    let port = MockSerialPort::new("MOCK_MODEM");
    let mut stack = at_stack(&port);
    let mut sim = stack.default_device().unwrap().open_sim().unwrap();

    assert!(matches!(
        sim.set_pin_query("12a4", true),
        Err(CellularError::Parameter(_))
    ));
    assert!(port.get_write_log().is_empty());
}
