use crate::config::UrlCheckConfig;
use crate::context::Context;
use crate::probe::{BoxError, Probe};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};

/// Checks that every configured URL answers with 200 OK before the deadline.
pub struct UrlCheck {
    client: Client,
    urls: Vec<String>,
}

impl UrlCheck {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            urls,
        }
    }

    pub fn from_config(config: &UrlCheckConfig) -> Self {
        Self::new(config.urls.clone())
    }

    pub fn is_enabled(&self) -> bool {
        !self.urls.is_empty()
    }
}

#[async_trait]
impl Probe for UrlCheck {
    async fn probe(&self, ctx: Context) -> Result<(), BoxError> {
        debug!("Checking {} URLs", self.urls.len());

        for url in &self.urls {
            let mut request = self.client.get(url);
            if let Some(remaining) = ctx.remaining() {
                request = request.timeout(remaining);
            }
            let response = request
                .send()
                .await
                .map_err(|e| format!("Failed to access {}: {}", url, e))?;
            if response.status() != StatusCode::OK {
                return Err(format!("URL {} returned status {}", url, response.status()).into());
            }
        }
        Ok(())
    }
}
