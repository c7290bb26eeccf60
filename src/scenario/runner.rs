//! Trial loop: repeat a scenario, aggregate pass/fail.

use std::fmt;
use std::future::Future;
use std::sync::atomic::Ordering;

use log::*;

use super::ScenarioResult;
use crate::common::HarnessError;
use crate::metrics::METRICS;

/// Aggregated result of a repeated run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    /// Trials actually executed (less than requested when stopping on
    /// first failure).
    pub trials: u32,
    pub passed: u32,
    pub failed: u32,
    pub first_failure: Option<u32>,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_failure {
            None => write!(f, "{}/{} passed", self.passed, self.trials),
            Some(i) => write!(
                f,
                "{}/{} passed, first failure at trial {}",
                self.passed, self.trials, i
            ),
        }
    }
}

/// Run `count` trials, constructing a fresh scenario future per trial.
///
/// `factory` is invoked once per trial so every trial gets fresh
/// connections and payloads; no trial state leaks into the next. In
/// stop-on-first-failure mode the loop returns at the first failing
/// trial with its index recorded; otherwise all trials run and the
/// total failure count is reported.
pub async fn run_trials<F, Fut>(
    count: u32,
    stop_on_first_failure: bool,
    mut factory: F,
) -> Result<Summary, HarnessError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ScenarioResult>,
{
    if count == 0 {
        return Err(HarnessError::InvalidParameter(
            "trial count must be at least 1",
        ));
    }

    let mut summary = Summary {
        trials: 0,
        passed: 0,
        failed: 0,
        first_failure: None,
    };

    for i in 0..count {
        let outcome = factory(i).await?;
        summary.trials += 1;
        METRICS.trials_run.fetch_add(1, Ordering::Relaxed);

        if outcome.passed {
            summary.passed += 1;
            debug!("trial {}: ok ({} bytes)", i, outcome.bytes_observed);
        } else {
            summary.failed += 1;
            METRICS.trials_failed.fetch_add(1, Ordering::Relaxed);
            if summary.first_failure.is_none() {
                summary.first_failure = Some(i);
            }
            warn!(
                "trial {}: failed, expected {} bytes, observed {}{}",
                i,
                outcome.bytes_expected,
                outcome.bytes_observed,
                outcome
                    .detail
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            );
            if stop_on_first_failure {
                break;
            }
        }
    }

    Ok(summary)
}
