//! An HTTP client that queries a running health check server.

use std::collections::BTreeMap;

use log::debug;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::status::Status;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    UnexpectedStatus(StatusCode),
}

/// Check if the server is running on the configured address and port.
pub async fn is_running(config: &ServerConfig) -> bool {
    if let Ok((StatusCode::OK, body)) = get(config, "/info").await {
        if let Ok(info) = serde_json::from_str::<serde_json::Value>(&body) {
            return info["name"] == env!("CARGO_PKG_NAME")
                && info["version"] == env!("CARGO_PKG_VERSION");
        }
    }

    false
}

/// Retrieve the detailed health status from the server.
pub async fn get_status(config: &ServerConfig) -> Result<Status, ClientError> {
    let uri = format!("{}?detail", config.path);
    let (status, body) = get(config, &uri).await?;
    let healthy = match status {
        StatusCode::OK => true,
        StatusCode::SERVICE_UNAVAILABLE => false,
        other => return Err(ClientError::UnexpectedStatus(other)),
    };
    let details: BTreeMap<String, String> = serde_json::from_str(&body)?;
    Ok(Status { healthy, details })
}

/// Send a GET request to the server.
async fn get(config: &ServerConfig, uri: &str) -> Result<(StatusCode, String), ClientError> {
    let url = format!("{}{}", config, uri);
    debug!("GET {}", url);
    let response = Client::new().get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ServerConfig {
        let address = server.address();
        ServerConfig {
            address: address.ip().to_string(),
            port: address.port(),
            path: "/healthcheck".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_status_unhealthy() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthcheck"))
            .and(query_param("detail", ""))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({"db": "timeout", "cache": "OK"})),
            )
            .mount(&mock_server)
            .await;

        let status = get_status(&config_for(&mock_server)).await.unwrap();
        assert!(!status.healthy);
        assert_eq!(status.details["db"], "timeout");
        assert_eq!(status.to_string(), "Unhealthy: db: timeout");
    }

    #[tokio::test]
    async fn test_get_status_unexpected_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = get_status(&config_for(&mock_server)).await;
        assert!(matches!(
            result,
            Err(ClientError::UnexpectedStatus(StatusCode::NOT_FOUND))
        ));
    }

    #[tokio::test]
    async fn test_is_running_checks_identity() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "something-else",
                "version": "1.0.0",
            })))
            .mount(&mock_server)
            .await;

        assert!(!is_running(&config_for(&mock_server)).await);
    }

    #[tokio::test]
    async fn test_is_running_without_server() {
        let config = ServerConfig {
            address: "127.0.0.1".to_string(),
            port: 1,
            path: "/healthcheck".to_string(),
        };
        assert!(!is_running(&config).await);
    }
}
