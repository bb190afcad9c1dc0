//! Ready to use probes.

mod database;
mod file_check;
mod task_check;
mod url_check;

pub use database::{Database, Pinger};
pub use file_check::FileCheck;
pub use task_check::TaskCount;
pub use url_check::UrlCheck;

use crate::config::ChecksConfig;
use crate::registry::Registry;
use log::debug;

/// Registers the bundled probes that are enabled in the configuration.
pub fn register_configured(registry: &Registry, config: &ChecksConfig) {
    let file_check = FileCheck::from_config(&config.file_check);
    if file_check.is_enabled() {
        let schedule = config.file_check.schedule;
        registry.register("files", file_check, schedule.timeout, schedule.options());
    } else {
        debug!("No files configured, skipping the file check");
    }

    let url_check = UrlCheck::from_config(&config.url_check);
    if url_check.is_enabled() {
        let schedule = config.url_check.schedule;
        registry.register("urls", url_check, schedule.timeout, schedule.options());
    } else {
        debug!("No URLs configured, skipping the URL check");
    }

    if let Some(max) = config.task_check.max {
        let schedule = config.task_check.schedule;
        registry.register("tasks", TaskCount::new(max), schedule.timeout, schedule.options());
    }
}
