use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::check::CheckError;

/// The detail reported for a passing check.
pub const OK: &str = "OK";

/// Detailed health of every registered check.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub healthy: bool,
    /// `OK` or the error message, keyed by check name.
    pub details: BTreeMap<String, String>,
}

impl Status {
    pub fn from_results(
        results: impl IntoIterator<Item = (String, Result<(), CheckError>)>,
    ) -> Self {
        let mut healthy = true;
        let details = results
            .into_iter()
            .map(|(name, result)| match result {
                Ok(()) => (name, OK.to_string()),
                Err(err) => {
                    healthy = false;
                    (name, err.to_string())
                }
            })
            .collect();
        Status { healthy, details }
    }

    /// The failing checks with their messages.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.details
            .iter()
            .filter(|(_, detail)| detail.as_str() != OK)
            .map(|(name, detail)| (name.as_str(), detail.as_str()))
    }
}

/// Formats the status as a human-readable line, e.g. `Unhealthy: db: timeout`.
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.healthy {
            return write!(f, "Healthy");
        }
        let failures: Vec<String> = self
            .failures()
            .map(|(name, detail)| format!("{}: {}", name, detail))
            .collect();
        write!(f, "Unhealthy: {}", failures.join(", "))
    }
}
