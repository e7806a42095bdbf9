//! Minimal test harness.
//!
//! Runs the cases of a [`Specification`] strictly in order on one blocking
//! thread, applies each case's [`FailurePolicy`], bounds the whole run by the
//! specification's timeout, and folds everything into a [`RunReport`].

mod case;
mod report;

pub use case::{
    Case, CaseFailure, CaseResult, FailureKind, FailurePolicy, Specification,
    DEFAULT_HOST_TEST, DEFAULT_RUN_TIMEOUT,
};
pub use report::{CaseOutcome, CaseReport, RunReport};

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Progress shared between the worker thread and the timeout watcher.
#[derive(Debug, Default)]
struct Progress {
    finished: Vec<CaseReport>,
    current: Option<(String, Instant)>,
    setup_failure: Option<CaseFailure>,
    /// Set when the global timeout fires; the worker starts no further case.
    cancelled: bool,
}

pub struct Harness;

impl Harness {
    /// Run `spec` against `fixture`.
    ///
    /// Never fails: setup refusals, case failures, panics and the global
    /// timeout all end up in the returned report.
    pub async fn run<C>(spec: Specification<C>, fixture: C) -> RunReport
    where
        C: Send + 'static,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let names = spec.case_names();
        let timeout = spec.timeout;
        let host_test = spec.host_test.clone();

        info!(
            %run_id,
            host_test = %host_test,
            timeout_secs = timeout.as_secs(),
            cases = names.len(),
            "starting test run"
        );

        let progress = Arc::new(Mutex::new(Progress::default()));
        let worker_progress = Arc::clone(&progress);
        let worker = tokio::task::spawn_blocking(move || execute(spec, fixture, &worker_progress));

        let mut timed_out = false;
        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(())) => {}
            Ok(Err(join_error)) => {
                let mut p = progress.lock();
                if let Some((name, started)) = p.current.take() {
                    error!(case = %name, "case panicked: {join_error}");
                    p.finished.push(CaseReport {
                        name,
                        outcome: CaseOutcome::Aborted,
                        failure: Some(CaseFailure::new(
                            FailureKind::Panic,
                            join_error.to_string(),
                        )),
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
            Err(_) => {
                timed_out = true;
                let mut p = progress.lock();
                p.cancelled = true;
                if let Some((name, started)) = p.current.take() {
                    error!(case = %name, timeout_secs = timeout.as_secs(), "run timed out");
                    p.finished.push(CaseReport {
                        name,
                        outcome: CaseOutcome::TimedOut,
                        failure: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                } else {
                    error!(timeout_secs = timeout.as_secs(), "run timed out");
                }
            }
        }

        let mut p = progress.lock();
        let mut cases = std::mem::take(&mut p.finished);
        for name in names.into_iter().skip(cases.len()) {
            cases.push(CaseReport::skipped(name));
        }

        let report = RunReport {
            run_id,
            started_at,
            host_test,
            timeout_secs: timeout.as_secs(),
            setup_failure: p.setup_failure.take(),
            timed_out,
            cases,
        };

        if report.passed() {
            info!(%run_id, "test run passed");
        } else {
            warn!(
                %run_id,
                passed = report.count(CaseOutcome::Passed),
                skipped = report.count(CaseOutcome::Skipped),
                timed_out,
                "test run failed"
            );
        }
        report
    }
}

fn execute<C>(spec: Specification<C>, mut fixture: C, progress: &Mutex<Progress>) {
    let Specification { cases, setup, .. } = spec;
    let total = cases.len();

    if let Some(setup) = setup {
        if let Err(failure) = setup(&mut fixture, total) {
            error!(%failure, "setup refused to run");
            progress.lock().setup_failure = Some(failure);
            return;
        }
    }

    for (index, mut case) in cases.into_iter().enumerate() {
        info!(case = %case.name, index = index + 1, total, ">>> running case");
        let started = Instant::now();
        {
            let mut p = progress.lock();
            if p.cancelled {
                warn!(case = %case.name, "run cancelled; not starting case");
                return;
            }
            p.current = Some((case.name.clone(), started));
        }

        let result = (case.handler)(&mut fixture);
        let duration_ms = started.elapsed().as_millis() as u64;

        let mut p = progress.lock();
        if p.cancelled {
            warn!(case = %case.name, duration_ms, "case finished after the run timed out");
            return;
        }
        p.current = None;
        match result {
            Ok(()) => {
                info!(case = %case.name, duration_ms, "<<< case passed");
                p.finished.push(CaseReport {
                    name: case.name,
                    outcome: CaseOutcome::Passed,
                    failure: None,
                    duration_ms,
                });
            }
            Err(failure) => {
                error!(case = %case.name, kind = %failure.kind, "<<< case failed: {}", failure.message);
                let outcome = match case.on_failure {
                    FailurePolicy::Abort => CaseOutcome::Aborted,
                    FailurePolicy::Continue => CaseOutcome::Failed,
                };
                p.finished.push(CaseReport {
                    name: case.name,
                    outcome,
                    failure: Some(failure),
                    duration_ms,
                });
                if outcome == CaseOutcome::Aborted {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        runs: Vec<&'static str>,
    }

    #[tokio::test]
    async fn test_all_cases_pass_in_order() {
        let spec = Specification::new(vec![
            Case::new("one", |c: &mut Counter| {
                c.runs.push("one");
                Ok(())
            }),
            Case::new("two", |c: &mut Counter| {
                assert_eq!(c.runs, vec!["one"]);
                Ok(())
            }),
        ]);
        let report = Harness::run(spec, Counter::default()).await;
        assert!(report.passed());
        assert_eq!(report.count(CaseOutcome::Passed), 2);
    }

    #[tokio::test]
    async fn test_abort_skips_remaining_cases() {
        let spec = Specification::new(vec![
            Case::new("fails", |_: &mut Counter| Err(CaseFailure::precondition("no context"))),
            Case::new("never", |_: &mut Counter| panic!("must not run")),
        ]);
        let report = Harness::run(spec, Counter::default()).await;

        assert!(!report.passed());
        assert_eq!(report.cases[0].outcome, CaseOutcome::Aborted);
        assert_eq!(report.cases[1].outcome, CaseOutcome::Skipped);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_continue_policy_runs_next_case() {
        let spec = Specification::new(vec![
            Case::new("fails", |_: &mut Counter| Err(CaseFailure::operation("nope")))
                .on_failure(FailurePolicy::Continue),
            Case::new("runs", |_: &mut Counter| Ok(())),
        ]);
        let report = Harness::run(spec, Counter::default()).await;

        assert_eq!(report.cases[0].outcome, CaseOutcome::Failed);
        assert_eq!(report.cases[1].outcome, CaseOutcome::Passed);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_setup_refusal_skips_everything() {
        let spec = Specification::new(vec![Case::new("never", |_: &mut Counter| Ok(()))])
            .with_setup(|_, n| {
                assert_eq!(n, 1);
                Err(CaseFailure::new(FailureKind::Setup, "not supported"))
            });
        let report = Harness::run(spec, Counter::default()).await;

        assert!(!report.passed());
        assert_eq!(report.cases[0].outcome, CaseOutcome::Skipped);
        assert_eq!(report.setup_failure.unwrap().kind, FailureKind::Setup);
    }

    #[tokio::test]
    async fn test_global_timeout_marks_running_case() {
        let ran = Arc::new(AtomicBool::new(false));
        let after_ran = Arc::clone(&ran);
        let spec = Specification::new(vec![
            Case::new("slow", |_: &mut Counter| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            }),
            Case::new("after", move |_: &mut Counter| {
                after_ran.store(true, Ordering::SeqCst);
                Ok(())
            }),
        ])
        .with_timeout(Duration::from_millis(50));
        let report = Harness::run(spec, Counter::default()).await;

        assert!(report.timed_out);
        assert_eq!(report.cases[0].outcome, CaseOutcome::TimedOut);
        assert_eq!(report.cases[1].outcome, CaseOutcome::Skipped);
        assert_eq!(report.exit_code(), 1);

        // Let the abandoned worker finish its sleep; the skipped case must stay unrun.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_case_is_reported() {
        let spec = Specification::new(vec![Case::new("boom", |_: &mut Counter| {
            panic!("driver exploded")
        })]);
        let report = Harness::run(spec, Counter::default()).await;

        let case = &report.cases[0];
        assert_eq!(case.outcome, CaseOutcome::Aborted);
        assert_eq!(case.failure.as_ref().unwrap().kind, FailureKind::Panic);
    }
}
