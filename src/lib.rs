//! A health check engine.
//!
//! Probes are registered on a [`Registry`] under a name, each with its own timeout and optionally
//! a background interval and a failure threshold. The registry reports the aggregated health on
//! demand and keeps background checks up to date on their own schedule.

pub mod check;
pub mod checks;
pub mod client;
pub mod config;
pub mod context;
pub mod probe;
pub mod registry;
pub mod server;
pub mod status;

pub use check::{Check, CheckError, CheckOption};
pub use context::Context;
pub use probe::{BoxError, Probe};
pub use registry::{Registry, RegistryError};
pub use status::Status;
