use crate::context::Context;
use crate::probe::{BoxError, Probe};
use async_trait::async_trait;
use log::debug;
use tokio::runtime::Handle;

/// Fails when the runtime has more alive tasks than allowed.
///
/// A growing task count is a cheap hint that work is being leaked somewhere. The probe itself
/// runs on a task, so it always counts at least one.
pub struct TaskCount {
    max: usize,
}

impl TaskCount {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

#[async_trait]
impl Probe for TaskCount {
    async fn probe(&self, _ctx: Context) -> Result<(), BoxError> {
        let alive = Handle::current().metrics().num_alive_tasks();
        debug!("{} tasks alive", alive);
        if alive > self.max {
            return Err(format!("number of tasks exceeded {}", self.max).into());
        }
        Ok(())
    }
}
