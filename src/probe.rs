use std::error::Error;
use std::future::Future;

use async_trait::async_trait;

use crate::context::Context;

/// The error type probes report. It is kept opaque and shown to users as-is.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A single health test.
///
/// Probes receive a context carrying the deadline of the current execution. They should return
/// soon after the context is done, but the engine does not rely on it: a probe that overruns its
/// deadline is abandoned and reported as timed out.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, ctx: Context) -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> Probe for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn probe(&self, ctx: Context) -> Result<(), BoxError> {
        self(ctx).await
    }
}
