use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use std::{env, fmt};

use crate::check::CheckOption;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub checks: ChecksConfig,
}

impl Config {
    pub fn new() -> Self {
        Config {
            server: ServerConfig {
                address: env::var("HEALTHCHECK_SERVER_ADDRESS")
                    .unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env_parse("HEALTHCHECK_SERVER_PORT", 8080),
                path: env::var("HEALTHCHECK_PATH").unwrap_or_else(|_| "/healthcheck".to_string()),
            },
            checks: ChecksConfig {
                file_check: FileCheckConfig {
                    files: env_list("HEALTHCHECK_FILECHECK_FILES"),
                    schedule: Schedule::from_env("FILECHECK", 30_000, 1_000),
                },
                url_check: UrlCheckConfig {
                    urls: env_list("HEALTHCHECK_URLCHECK_URLS"),
                    schedule: Schedule::from_env("URLCHECK", 60_000, 10_000),
                },
                task_check: TaskCheckConfig {
                    max: env::var("HEALTHCHECK_TASKCHECK_MAX")
                        .ok()
                        .and_then(|max| max.parse().ok()),
                    schedule: Schedule::from_env("TASKCHECK", 0, 1_000),
                },
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// The route the health endpoint is mounted on.
    pub path: String,
}

/// The base URL of the server, e.g. `http://127.0.0.1:8080`.
impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct ChecksConfig {
    pub file_check: FileCheckConfig,
    pub url_check: UrlCheckConfig,
    pub task_check: TaskCheckConfig,
}

/// How a bundled check is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Zero runs the check on every query.
    pub interval: Duration,
    pub timeout: Duration,
    pub threshold: u32,
}

impl Schedule {
    /// Reads `HEALTHCHECK_<PREFIX>_{INTERVAL,TIMEOUT,THRESHOLD}`, in milliseconds.
    fn from_env(prefix: &str, interval_ms: u64, timeout_ms: u64) -> Self {
        let key = |name: &str| format!("HEALTHCHECK_{}_{}", prefix, name);
        Schedule {
            interval: Duration::from_millis(env_parse(&key("INTERVAL"), interval_ms)),
            timeout: Duration::from_millis(env_parse(&key("TIMEOUT"), timeout_ms)),
            threshold: env_parse(&key("THRESHOLD"), 0),
        }
    }

    pub fn options(&self) -> Vec<CheckOption> {
        let mut options = Vec::new();
        if !self.interval.is_zero() {
            options.push(CheckOption::InBackground(self.interval));
        }
        if self.threshold > 0 {
            options.push(CheckOption::WithThreshold(self.threshold));
        }
        options
    }
}

#[derive(Debug, Clone)]
pub struct FileCheckConfig {
    pub files: Vec<String>,
    pub schedule: Schedule,
}

#[derive(Debug, Clone)]
pub struct UrlCheckConfig {
    pub urls: Vec<String>,
    pub schedule: Schedule,
}

#[derive(Debug, Clone)]
pub struct TaskCheckConfig {
    /// Maximum number of alive runtime tasks. The check is disabled when unset.
    pub max: Option<usize>,
    pub schedule: Schedule,
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::new);

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Reads a comma separated list, skipping empty entries.
fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
