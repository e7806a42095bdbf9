//! Test cases, their failures, and the specification that orders them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Global run timeout used when the specification does not set one.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Host-side test name announced at setup.
pub const DEFAULT_HOST_TEST: &str = "default_auto";

/// Why a case failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A handle was missing or the run was not in the state the case needs.
    Precondition,
    /// A call returned neither OK nor an accepted alternate.
    Operation,
    /// A call succeeded but reported something other than expected.
    StateMismatch,
    /// Setup refused to start the run.
    Setup,
    /// The case panicked.
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Precondition => "precondition",
            Self::Operation => "operation",
            Self::StateMismatch => "state mismatch",
            Self::Setup => "setup",
            Self::Panic => "panic",
        };
        f.write_str(s)
    }
}

/// A structured case failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl CaseFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Precondition, message)
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Operation, message)
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::new(FailureKind::StateMismatch, message)
    }
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)
    }
}

impl std::error::Error for CaseFailure {}

pub type CaseResult = Result<(), CaseFailure>;

/// What the harness does after a case fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run; later cases are skipped.
    #[default]
    Abort,
    /// Record the failure and run the next case.
    Continue,
}

type Handler<C> = Box<dyn FnMut(&mut C) -> CaseResult + Send>;
type SetupHook<C> = Box<dyn FnOnce(&mut C, usize) -> CaseResult + Send>;

/// A named case run against the shared fixture `C`.
pub struct Case<C> {
    pub(crate) name: String,
    pub(crate) handler: Handler<C>,
    pub(crate) on_failure: FailurePolicy,
}

impl<C> Case<C> {
    /// A case that aborts the run when it fails.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&mut C) -> CaseResult + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Box::new(handler),
            on_failure: FailurePolicy::Abort,
        }
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C> fmt::Debug for Case<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("on_failure", &self.on_failure)
            .finish()
    }
}

/// Ordered cases plus run-level settings.
pub struct Specification<C> {
    pub(crate) cases: Vec<Case<C>>,
    pub(crate) setup: Option<SetupHook<C>>,
    pub(crate) timeout: Duration,
    pub(crate) host_test: String,
}

impl<C> Specification<C> {
    pub fn new(cases: Vec<Case<C>>) -> Self {
        Self {
            cases,
            setup: None,
            timeout: DEFAULT_RUN_TIMEOUT,
            host_test: DEFAULT_HOST_TEST.to_string(),
        }
    }

    /// Hook run once before the first case with the number of cases.
    ///
    /// An error skips every case and fails the run.
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut C, usize) -> CaseResult + Send + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Bound on the whole run, enforced by the harness.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_host_test(mut self, host_test: impl Into<String>) -> Self {
        self.host_test = host_test.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn case_names(&self) -> Vec<String> {
        self.cases.iter().map(|c| c.name.clone()).collect()
    }
}
