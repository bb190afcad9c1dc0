use std::error::Error;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::context::Context;
use crate::probe::{BoxError, Probe};

/// Why a check is considered failing.
#[derive(Error, Debug, Clone)]
pub enum CheckError {
    /// The check has not run yet. Every check starts out in this state.
    #[error("this check never ran")]
    NeverChecked,
    #[error("timeout")]
    Timeout,
    #[error("probe panicked")]
    Panicked,
    /// The error returned by the probe, passed through unchanged.
    #[error("{0}")]
    Probe(Arc<dyn Error + Send + Sync>),
}

impl From<BoxError> for CheckError {
    fn from(err: BoxError) -> Self {
        CheckError::Probe(Arc::from(err))
    }
}

/// Modifiers applied to a check when it is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOption {
    /// Run the probe in the background on the given interval instead of on every query. Queries
    /// then report the result of the most recent background run.
    InBackground(Duration),
    /// Only report the check as failing after this many failures in a row.
    WithThreshold(u32),
}

impl CheckOption {
    fn apply(self, check: &mut Check) {
        match self {
            CheckOption::InBackground(interval) => check.interval = interval,
            CheckOption::WithThreshold(threshold) => {
                check.threshold = threshold;
                // A thresholded check that never ran must not look healthy, so the failure
                // counter starts at the threshold until the first run replaces it.
                check.state_mut().consecutive_failures = threshold;
            }
        }
    }
}

#[derive(Debug)]
struct CheckState {
    last_error: Option<CheckError>,
    consecutive_failures: u32,
    /// False until the probe has run once. The counter holds the seeded threshold until then.
    checked: bool,
}

/// A probe wrapped with timeout enforcement and failure threshold bookkeeping.
pub struct Check {
    name: String,
    probe: Arc<dyn Probe>,
    timeout: Duration,
    interval: Duration,
    threshold: u32,
    state: RwLock<CheckState>,
    /// Held for a whole run so runs of the same check never overlap.
    running: Mutex<()>,
}

impl Check {
    pub fn new(
        name: impl Into<String>,
        probe: Arc<dyn Probe>,
        timeout: Duration,
        options: impl IntoIterator<Item = CheckOption>,
    ) -> Self {
        let mut check = Check {
            name: name.into(),
            probe,
            timeout,
            interval: Duration::ZERO,
            threshold: 0,
            state: RwLock::new(CheckState {
                last_error: Some(CheckError::NeverChecked),
                consecutive_failures: 0,
                checked: false,
            }),
            running: Mutex::new(()),
        };
        for option in options {
            option.apply(&mut check);
        }
        check
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_in_background(&self) -> bool {
        !self.interval.is_zero()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state().consecutive_failures
    }

    /// Returns the health of the check.
    ///
    /// Synchronous checks run the probe first. Background checks only read the result of their
    /// last run and never wait on a probe.
    pub async fn evaluate(&self, ctx: &Context) -> Result<(), CheckError> {
        // Kept until the state is read so a synchronous check reports its own run.
        let _running = if self.is_in_background() {
            None
        } else {
            let running = self.running.lock().await;
            self.run(ctx).await;
            Some(running)
        };

        let state = self.state();
        if state.consecutive_failures < self.threshold {
            return Ok(());
        }
        match &state.last_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Runs the probe once and records the outcome.
    ///
    /// Runs of the same check are serialised: a run waits for the previous one to be recorded.
    /// The probe runs on its own task and races a timer of `timeout`. When the timer wins the
    /// probe's context is cancelled and the task is left to finish on its own; it is never
    /// awaited, so a probe ignoring its context keeps running detached from the engine.
    pub async fn execute(&self, ctx: &Context) {
        let _running = self.running.lock().await;
        self.run(ctx).await;
    }

    async fn run(&self, ctx: &Context) {
        let ctx = ctx.with_timeout(self.timeout);
        let probe = Arc::clone(&self.probe);
        let probe_ctx = ctx.clone();
        let task = tokio::spawn(async move { probe.probe(probe_ctx).await });

        let outcome = tokio::select! {
            joined = task => match joined {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(CheckError::from(err)),
                Err(err) => {
                    warn!("Probe of {} did not complete: {}", self.name, err);
                    Some(CheckError::Panicked)
                }
            },
            _ = ctx.done() => Some(CheckError::Timeout),
        };
        ctx.cancel();

        self.record(outcome);
    }

    fn record(&self, outcome: Option<CheckError>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.checked {
            state.checked = true;
            state.consecutive_failures = 0;
        }
        match outcome {
            Some(err) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                debug!(
                    "{} failed ({} in a row): {}",
                    self.name, state.consecutive_failures, err
                );
                state.last_error = Some(err);
            }
            None => {
                debug!("{} succeeded", self.name);
                state.consecutive_failures = 0;
                state.last_error = None;
            }
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, CheckState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut CheckState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}
