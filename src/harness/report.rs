//! Aggregate results of a harness run.

use super::case::CaseFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a single case ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    /// Failed; the run continued.
    Failed,
    /// Failed; the run stopped here.
    Aborted,
    /// Never started.
    Skipped,
    /// Still running when the global timeout expired.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CaseFailure>,
    pub duration_ms: u64,
}

impl CaseReport {
    pub(crate) fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: CaseOutcome::Skipped,
            failure: None,
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub host_test: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_failure: Option<CaseFailure>,
    pub timed_out: bool,
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    /// True only when setup succeeded and every case passed in time.
    pub fn passed(&self) -> bool {
        self.setup_failure.is_none()
            && !self.timed_out
            && self.cases.iter().all(|c| c.outcome == CaseOutcome::Passed)
    }

    pub fn count(&self, outcome: CaseOutcome) -> usize {
        self.cases.iter().filter(|c| c.outcome == outcome).count()
    }

    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// Process exit status for this run.
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One line per case plus a totals line.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for case in &self.cases {
            out.push_str(&format!("{:<10} {}", format!("{:?}", case.outcome), case.name));
            if let Some(failure) = &case.failure {
                out.push_str(&format!(" ({failure})"));
            }
            out.push('\n');
        }
        if let Some(failure) = &self.setup_failure {
            out.push_str(&format!("setup refused: {failure}\n"));
        }
        out.push_str(&format!(
            "{} passed, {} failed, {} skipped{}: {}",
            self.count(CaseOutcome::Passed),
            self.count(CaseOutcome::Failed) + self.count(CaseOutcome::Aborted),
            self.count(CaseOutcome::Skipped),
            if self.timed_out { ", timed out" } else { "" },
            if self.passed() { "SUCCESS" } else { "FAILURE" },
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::FailureKind;

    fn report(cases: Vec<CaseReport>) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            host_test: "default_auto".into(),
            timeout_secs: 600,
            setup_failure: None,
            timed_out: false,
            cases,
        }
    }

    fn passed(name: &str) -> CaseReport {
        CaseReport {
            name: name.into(),
            outcome: CaseOutcome::Passed,
            failure: None,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_all_passed() {
        let r = report(vec![passed("a"), passed("b")]);
        assert!(r.passed());
        assert_eq!(r.exit_code(), 0);
        assert!(r.summary().ends_with("2 passed, 0 failed, 0 skipped: SUCCESS"));
    }

    #[test]
    fn test_aborted_and_skipped() {
        let r = report(vec![
            CaseReport {
                name: "a".into(),
                outcome: CaseOutcome::Aborted,
                failure: Some(CaseFailure::new(FailureKind::Precondition, "no context")),
                duration_ms: 3,
            },
            CaseReport::skipped("b"),
        ]);
        assert!(!r.passed());
        assert_eq!(r.exit_code(), 1);
        assert_eq!(r.count(CaseOutcome::Skipped), 1);
        assert!(r.summary().contains("precondition failure: no context"));
    }

    #[test]
    fn test_empty_run_passes_unless_timed_out() {
        let mut r = report(vec![]);
        assert!(r.passed());
        r.timed_out = true;
        assert!(!r.passed());
    }
}
