use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::check::{Check, CheckError, CheckOption};
use crate::context::Context;
use crate::probe::Probe;
use crate::status::Status;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("the background checks are already running")]
    AlreadyStarted,
    #[error("the background checks have been stopped")]
    Stopped,
}

enum Scheduler {
    NotStarted,
    Running {
        ctx: Context,
        tasks: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// A named collection of checks plus the scheduler running the background ones.
pub struct Registry {
    checks: RwLock<HashMap<String, Arc<Check>>>,
    scheduler: Mutex<Scheduler>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            checks: RwLock::new(HashMap::new()),
            scheduler: Mutex::new(Scheduler::NotStarted),
        }
    }

    /// Registers a probe under the given name, replacing any check previously registered under
    /// that name.
    ///
    /// Background checks registered after [`Registry::start`] are not scheduled.
    pub fn register(
        &self,
        name: impl Into<String>,
        probe: impl Probe + 'static,
        timeout: Duration,
        options: impl IntoIterator<Item = CheckOption>,
    ) {
        let name = name.into();
        let check = Arc::new(Check::new(name.clone(), Arc::new(probe), timeout, options));
        debug!(
            "Registering {} (timeout {:?}, interval {:?}, threshold {})",
            name,
            check.timeout(),
            check.interval(),
            check.threshold()
        );
        let mut checks = self.checks.write().unwrap_or_else(PoisonError::into_inner);
        if checks.insert(name.clone(), check).is_some() {
            warn!("Replaced the check previously registered as {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Check>> {
        self.checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The names of all registered checks, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().into_iter().map(|(name, _)| name).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts running the background checks.
    ///
    /// Every check registered with an interval runs once before this returns, so its status is
    /// known before the first tick. Each one then gets its own task re-running it on its interval
    /// until [`Registry::stop`] is called or `ctx` is done. A tick that arrives while the previous
    /// run of the same check is still going is skipped.
    pub async fn start(&self, ctx: &Context) -> Result<(), RegistryError> {
        let ctx = ctx.child();
        {
            let mut scheduler = self.scheduler();
            match *scheduler {
                Scheduler::NotStarted => {}
                Scheduler::Running { .. } => {
                    warn!("Background checks are already running.");
                    return Err(RegistryError::AlreadyStarted);
                }
                Scheduler::Stopped => {
                    warn!("Background checks cannot be restarted once stopped.");
                    return Err(RegistryError::Stopped);
                }
            }
            *scheduler = Scheduler::Running {
                ctx: ctx.clone(),
                tasks: Vec::new(),
            };
        }

        let background: Vec<Arc<Check>> = self
            .snapshot()
            .into_iter()
            .map(|(_, check)| check)
            .filter(|check| check.is_in_background())
            .collect();

        for check in &background {
            check.execute(&ctx).await;
        }

        let tasks: Vec<JoinHandle<()>> = background
            .into_iter()
            .map(|check| spawn_background(check, ctx.clone()))
            .collect();
        let count = tasks.len();

        match &mut *self.scheduler() {
            Scheduler::Running { tasks: running, .. } => running.extend(tasks),
            // Stopped while the initial runs were in progress.
            _ => tasks.iter().for_each(JoinHandle::abort),
        }
        info!("Started {} background checks.", count);
        Ok(())
    }

    /// Stops the background checks.
    ///
    /// Once this returns no background run changes any check anymore. Calling it on a registry
    /// that was never started, or calling it twice, does nothing.
    pub async fn stop(&self) {
        let running = {
            let mut scheduler = self.scheduler();
            match *scheduler {
                Scheduler::Running { .. } => std::mem::replace(&mut *scheduler, Scheduler::Stopped),
                _ => return,
            }
        };

        if let Scheduler::Running { ctx, tasks } = running {
            ctx.cancel();
            for task in &tasks {
                task.abort();
            }
            for task in tasks {
                if let Err(err) = task.await {
                    if err.is_panic() {
                        warn!("A background check loop panicked: {}", err);
                    }
                }
            }
            info!("Stopped background checks.");
        }
    }

    /// Evaluates every check and returns the failing ones. An empty map means healthy.
    ///
    /// Synchronous checks run now, concurrently with each other. Background checks report their
    /// last result.
    pub async fn aggregate_status(&self, ctx: &Context) -> HashMap<String, CheckError> {
        evaluate_all(self.snapshot(), ctx)
            .await
            .into_iter()
            .filter_map(|(name, result)| result.err().map(|err| (name, err)))
            .collect()
    }

    pub async fn is_healthy(&self, ctx: &Context) -> bool {
        self.aggregate_status(ctx).await.is_empty()
    }

    /// Evaluates every check and reports `OK` or the error message for each of them.
    pub async fn status(&self, ctx: &Context) -> Status {
        Status::from_results(evaluate_all(self.snapshot(), ctx).await)
    }

    fn snapshot(&self) -> Vec<(String, Arc<Check>)> {
        self.checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, check)| (name.clone(), Arc::clone(check)))
            .collect()
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let scheduler = self
            .scheduler
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Scheduler::Running { ctx, tasks } = scheduler {
            ctx.cancel();
            tasks.iter().for_each(JoinHandle::abort);
        }
    }
}

fn spawn_background(check: Arc<Check>, ctx: Context) -> JoinHandle<()> {
    debug!("Initializing loop for {}", check.name());
    tokio::spawn(async move {
        let period = check.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = ctx.done() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = ctx.done() => break,
                        _ = check.execute(&ctx) => {}
                    }
                }
            }
        }
        debug!("Stopped loop for {}", check.name());
    })
}

async fn evaluate_all(
    checks: Vec<(String, Arc<Check>)>,
    ctx: &Context,
) -> Vec<(String, Result<(), CheckError>)> {
    let mut set = JoinSet::new();
    let mut names = HashMap::with_capacity(checks.len());
    for (name, check) in checks {
        let ctx = ctx.clone();
        let task_name = name.clone();
        let handle = set.spawn(async move {
            let result = check.evaluate(&ctx).await;
            (task_name, result)
        });
        names.insert(handle.id(), name);
    }

    let mut results = Vec::with_capacity(names.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => {
                warn!("Evaluating a check failed: {}", err);
                if let Some(name) = names.remove(&err.id()) {
                    results.push((name, Err(CheckError::Panicked)));
                }
            }
        }
    }
    results
}
