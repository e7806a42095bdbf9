//! SIM interface test sequence.
//!
//! Two cases, run in order by the harness:
//!
//! 1. **`CellularSIM init`**: take the context and device from the injected
//!    stack and bring the device to ready.
//! 2. **`CellularSIM test interface`**: open the SIM, set the modem timeout,
//!    let the SIM interface settle, then unlock with the PIN, toggle the PIN
//!    query off and on, require state `Ready`, and read a non-empty IMSI.
//!
//! Every check that fails ends the case with a [`CaseFailure`]; both cases
//! abort the run on failure, so the interface case only ever runs on a ready
//! device.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::cellular::{
    CellularContext, CellularDevice, CellularError, CellularResult, CellularStack, SimState,
};
use crate::config::{HarnessConfig, SequenceConfig, SettleMode};
use crate::harness::{Case, CaseFailure, CaseResult, FailureKind, Specification};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INIT_CASE: &str = "CellularSIM init";
pub const INTERFACE_CASE: &str = "CellularSIM test interface";

/// Where the device is in its (one-way) bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingDeviceReady,
    DeviceReady,
}

/// Everything the two cases share.
pub struct SimTestFixture {
    stack: Box<dyn CellularStack>,
    pin: String,
    settings: SequenceConfig,
    clock: Arc<dyn Clock>,
    phase: Phase,
    context: Option<Box<dyn CellularContext>>,
    device: Option<Box<dyn CellularDevice>>,
}

impl SimTestFixture {
    pub fn new(
        stack: Box<dyn CellularStack>,
        pin: impl Into<String>,
        settings: SequenceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stack,
            pin: pin.into(),
            settings,
            clock,
            phase: Phase::AwaitingDeviceReady,
            context: None,
            device: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl std::fmt::Debug for SimTestFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTestFixture")
            .field("phase", &self.phase)
            .field("settings", &self.settings)
            .field("has_context", &self.context.is_some())
            .field("has_device", &self.device.is_some())
            .finish()
    }
}

/// The two-case specification, with run settings from `harness`.
pub fn specification(harness: &HarnessConfig) -> Specification<SimTestFixture> {
    Specification::new(vec![
        Case::new(INIT_CASE, init_to_device_ready_state),
        Case::new(INTERFACE_CASE, test_sim_interface),
    ])
    .with_setup(setup)
    .with_timeout(harness.timeout())
    .with_host_test(harness.host_test.clone())
}

fn setup(fixture: &mut SimTestFixture, cases: usize) -> CaseResult {
    if fixture.pin.is_empty() {
        return Err(CaseFailure::new(
            FailureKind::Setup,
            "SIM pin code is needed",
        ));
    }
    info!(
        cases,
        sim_timeout_ms = fixture.settings.sim_timeout_ms,
        settle_ms = fixture.settings.settle_ms,
        settle_mode = ?fixture.settings.settle_mode,
        "SIM interface sequence ready"
    );
    Ok(())
}

/// Case 1: bring the device up.
pub fn init_to_device_ready_state(fixture: &mut SimTestFixture) -> CaseResult {
    let mut context = fixture
        .stack
        .default_context()
        .ok_or_else(|| CaseFailure::precondition("no default cellular context"))?;

    context.set_device_ready().map_err(|e| {
        CaseFailure::precondition(format!("device-ready transition failed: {e}"))
    })?;

    let device = fixture
        .stack
        .default_device()
        .ok_or_else(|| CaseFailure::precondition("no default cellular device"))?;

    fixture.context = Some(context);
    fixture.device = Some(device);
    fixture.phase = Phase::DeviceReady;
    info!("device ready");
    Ok(())
}

/// Case 2: exercise the SIM interface.
pub fn test_sim_interface(fixture: &mut SimTestFixture) -> CaseResult {
    if fixture.phase != Phase::DeviceReady {
        return Err(CaseFailure::precondition("device is not ready"));
    }
    let device = fixture
        .device
        .as_mut()
        .ok_or_else(|| CaseFailure::precondition("no device handle"))?;
    let clock = fixture.clock.as_ref();
    let settings = &fixture.settings;
    let pin = fixture.pin.as_str();

    let mut sim = device
        .open_sim()
        .ok_or_else(|| CaseFailure::precondition("open_sim returned no handle"))?;

    device.set_timeout(settings.sim_timeout());
    settle(&mut **device, settings, clock);

    expect_ok("set_pin", sim.set_pin(pin))?;

    clock.sleep(settings.step_delay());
    expect_ok_or_unsupported("set_pin_query(off)", sim.set_pin_query(pin, false))?;

    clock.sleep(settings.step_delay());
    expect_ok_or_unsupported("set_pin_query(on)", sim.set_pin_query(pin, true))?;

    clock.sleep(settings.step_delay());
    let state = expect_ok("get_sim_state", sim.get_sim_state())?;
    if state != SimState::Ready {
        return Err(CaseFailure::mismatch(format!(
            "SIM state is {state}, expected ready"
        )));
    }

    clock.sleep(settings.step_delay());
    let imsi = expect_ok("get_imsi", sim.get_imsi())?;
    if imsi.is_empty() {
        return Err(CaseFailure::mismatch("IMSI is empty"));
    }
    info!(imsi_len = imsi.len(), "SIM interface checks passed");
    Ok(())
}

/// Wait for the SIM interface after the timeout change.
///
/// In poll mode each probe's timeout is capped at what is left of the settle
/// period; the operation timeout is restored afterwards.
fn settle(device: &mut dyn CellularDevice, settings: &SequenceConfig, clock: &dyn Clock) {
    let period = settings.settle();
    match settings.settle_mode {
        SettleMode::Fixed => clock.sleep(period),
        SettleMode::Poll => {
            poll_until_ready(device, settings, clock);
            device.set_timeout(settings.sim_timeout());
        }
    }
}

fn poll_until_ready(device: &mut dyn CellularDevice, settings: &SequenceConfig, clock: &dyn Clock) {
    let deadline = clock.now() + settings.settle();
    loop {
        let remaining = deadline.saturating_duration_since(clock.now());
        if remaining.is_zero() {
            warn!(settle_ms = settings.settle_ms, "device not ready after settle period");
            return;
        }
        device.set_timeout(remaining.min(settings.sim_timeout()));
        match device.is_ready() {
            Ok(true) => {
                debug!("device answered readiness poll");
                return;
            }
            Ok(false) => {}
            Err(e) => debug!(error = %e, "readiness poll failed"),
        }
        let remaining = deadline.saturating_duration_since(clock.now());
        if remaining.is_zero() {
            warn!(settle_ms = settings.settle_ms, "device not ready after settle period");
            return;
        }
        clock.sleep(settings.poll_interval().min(remaining));
    }
}

fn expect_ok<T>(step: &str, result: CellularResult<T>) -> Result<T, CaseFailure> {
    result.map_err(|e| {
        CaseFailure::operation(format!("{step} returned {}: {e}", e.code()))
    })
}

fn expect_ok_or_unsupported(step: &str, result: CellularResult<()>) -> CaseResult {
    match result {
        Ok(()) => Ok(()),
        Err(CellularError::Unsupported) => {
            info!(step, "not supported by this modem; accepted");
            Ok(())
        }
        Err(e) => Err(CaseFailure::operation(format!(
            "{step} returned {}: {e}",
            e.code()
        ))),
    }
}
