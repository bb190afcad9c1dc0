use crate::config::FileCheckConfig;
use crate::context::Context;
use crate::probe::{BoxError, Probe};
use async_trait::async_trait;
use log::debug;
use std::fs;

/// Checks that every configured file exists and is not empty.
pub struct FileCheck {
    files: Vec<String>,
}

impl FileCheck {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    pub fn from_config(config: &FileCheckConfig) -> Self {
        Self::new(config.files.clone())
    }

    pub fn is_enabled(&self) -> bool {
        !self.files.is_empty()
    }
}

#[async_trait]
impl Probe for FileCheck {
    async fn probe(&self, _ctx: Context) -> Result<(), BoxError> {
        debug!("Checking {} files", self.files.len());

        for file in &self.files {
            let metadata =
                fs::metadata(file).map_err(|e| format!("Failed to access {}: {}", file, e))?;
            if metadata.len() == 0 {
                return Err(format!("File {} is empty", file).into());
            }
        }
        Ok(())
    }
}
