use crate::context::Context;
use crate::probe::{BoxError, Probe};
use async_trait::async_trait;

/// Anything that can be pinged, typically a database connection pool.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, ctx: &Context) -> Result<(), BoxError>;
}

/// Checks that a database is up by pinging it.
pub struct Database<P> {
    pinger: P,
}

impl<P: Pinger> Database<P> {
    pub fn new(pinger: P) -> Self {
        Self { pinger }
    }
}

#[async_trait]
impl<P: Pinger> Probe for Database<P> {
    async fn probe(&self, ctx: Context) -> Result<(), BoxError> {
        self.pinger.ping(&ctx).await
    }
}
