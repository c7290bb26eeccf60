//! Scenario implementations and the trial loop.
//!
//! A scenario is one self-contained test procedure: open connection(s),
//! perform actions against the server under test, judge pass/fail.
//! `runner` repeats a scenario and aggregates the results.

pub mod lifecycle;
pub mod many_conn;
pub mod oracle;
pub mod runner;
pub mod secure;

pub use runner::{run_trials, Summary};

use crate::common::HarnessError;

/// Pass/fail plus byte accounting for one trial.
#[derive(Clone, Debug)]
pub struct TrialOutcome {
    pub passed: bool,
    pub bytes_expected: u64,
    pub bytes_observed: u64,
    /// Extra failure context: first differing offset, failing
    /// connection index, transport error text.
    pub detail: Option<String>,
}

impl TrialOutcome {
    pub fn pass(bytes: u64) -> Self {
        Self {
            passed: true,
            bytes_expected: bytes,
            bytes_observed: bytes,
            detail: None,
        }
    }

    pub fn fail(expected: u64, observed: u64, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            bytes_expected: expected,
            bytes_observed: observed,
            detail: Some(detail.into()),
        }
    }
}

/// Scenario-level result: `Err` aborts the whole run, `Ok(outcome)`
/// feeds the trial summary whether it passed or failed.
pub type ScenarioResult = Result<TrialOutcome, HarnessError>;
