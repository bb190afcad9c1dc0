use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::context::Context;
use crate::registry::Registry;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("the server is already running")]
    AlreadyRunning,
    #[error("failed to bind to {0}: {1}")]
    Bind(String, std::io::Error),
}

/// Builds the health endpoint for the given registry, to be mounted by the caller.
///
/// `GET <path>` answers 200 when every check passes and 503 otherwise. With a `detail` query
/// parameter the body lists every check with `OK` or its error message.
pub fn routes(registry: Arc<Registry>, path: &str) -> Router {
    Router::new()
        .route(path, get(health_handler))
        .with_state(registry)
}

async fn health_handler(
    State(registry): State<Arc<Registry>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let status = registry.status(&Context::background()).await;
    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    debug!("Health endpoint: {}", status);

    if params.contains_key("detail") {
        (code, Json(status.details)).into_response()
    } else {
        code.into_response()
    }
}

async fn info_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serves the health endpoint of a registry on the configured address.
pub struct Server {
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Server {
    pub fn new(registry: Arc<Registry>) -> Self {
        Server {
            registry,
            shutdown: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn router(&self, config: &ServerConfig) -> Router {
        routes(Arc::clone(&self.registry), &config.path)
            .route("/info", get(info_handler))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn start(&mut self, config: &ServerConfig) -> Result<(), ServerError> {
        if self.is_running() {
            warn!("Server is already running.");
            return Err(ServerError::AlreadyRunning);
        }

        let app = self.router(config);
        let addr = format!("{}:{}", config.address, config.port);
        debug!("Connecting to {}", addr);
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                return Err(ServerError::Bind(addr, e));
            }
        };

        // A token cancelled by an earlier stop would shut the new server down at once.
        self.shutdown = CancellationToken::new();
        let shutdown = self.shutdown.clone();
        self.handle = Some(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }));
        info!("Server started.");
        Ok(())
    }

    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.shutdown.cancel();
        if let Err(e) = handle.await {
            error!("Server task failed: {}", e);
        }
        info!("Server stopped.");
    }
}
