//! API server implementation.
//!
//! Provides health, ready, catalog and curated-list endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{BoxError, Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use herodex_catalog::{CatalogStore, DatasetSource, JsonFileSource, ListStore};
use herodex_core::storage::{MemoryBackend, StorageBackend};
use herodex_core::Result;

use crate::config::{Config, CorsConfig};
use crate::context::REQUEST_ID_HEADER;
use crate::error::ApiError;

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Lazily loaded superhero catalog.
    pub catalog: Arc<CatalogStore>,
    /// Durable curated lists.
    pub lists: Arc<ListStore>,
}

impl AppState {
    /// Creates application state from its parts.
    #[must_use]
    pub fn new(config: Config, catalog: Arc<CatalogStore>, lists: Arc<ListStore>) -> Self {
        Self {
            config,
            catalog,
            lists,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't load the catalog.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK once the catalog has loaded, triggering the load if needed.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.catalog.load().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(e.to_string()),
            }),
        ),
    }
}

async fn openapi_document() -> impl IntoResponse {
    Json(crate::openapi::openapi())
}

async fn handle_layer_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::request_timeout("request timed out")
    } else {
        ApiError::internal(format!("unhandled middleware error: {err}"))
    }
}

// ============================================================================
// Server
// ============================================================================

/// The herodex API server.
pub struct Server {
    config: Config,
    catalog: Arc<CatalogStore>,
    lists: Arc<ListStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("lists", &self.lists)
            .finish()
    }
}

impl Server {
    /// Creates a new server reading the configured dataset files.
    ///
    /// Lists are kept in memory; use [`ServerBuilder::list_backend`] for
    /// durable lists.
    #[must_use]
    pub fn new(config: Config) -> Self {
        ServerBuilder::new().config(config).build()
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState::new(
            self.config.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.lists),
        ));

        let cors = self.build_cors_layer();

        let mut api = crate::routes::api_routes();
        if let Some(limit) = state.config.concurrency_limit {
            api = api.layer(ConcurrencyLimitLayer::new(limit));
        }
        if let Some(secs) = state.config.request_timeout_secs {
            api = api.layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_layer_error))
                    .layer(TimeoutLayer::new(Duration::from_secs(secs))),
            );
        }

        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/openapi.json", get(openapi_document))
            .merge(api)
            // Middleware (order matters): request id outermost so every response carries it.
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(crate::context::request_id_middleware))
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn cors_allows_any_origin(cors_config: &CorsConfig) -> bool {
        cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*")
    }

    fn parse_cors_origins(cors_config: &CorsConfig) -> Vec<HeaderValue> {
        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }
        allowed
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if Self::cors_allows_any_origin(cors_config) {
            return cors.allow_origin(Any);
        }

        if cors_config
            .allowed_origins
            .iter()
            .any(|origin| origin == "*")
        {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed = Self::parse_cors_origins(cors_config);

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the catalog cannot be
    /// preloaded, or the server cannot bind to the port.
    pub async fn serve(&self) -> Result<()> {
        self.validate_config()?;

        if self.config.preload_catalog {
            let snapshot = self
                .catalog
                .load()
                .await
                .map_err(|e| herodex_core::Error::Internal {
                    message: format!("catalog preload failed: {e}"),
                })?;
            tracing::info!(superheroes = snapshot.len(), "Catalog preloaded");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(
            http_port = self.config.http_port,
            debug = self.config.debug,
            "Starting herodex API server"
        );

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| herodex_core::Error::Internal {
                    message: format!("failed to bind to {addr}: {e}"),
                })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| herodex_core::Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to test
    /// the routes without actually binding to a port.
    #[doc(hidden)]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }

    /// Checks the production constraints on the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a wildcard CORS origin or in-memory lists are
    /// configured while `debug` is off.
    pub fn validate_config(&self) -> Result<()> {
        if !self.config.debug
            && self
                .config
                .cors
                .allowed_origins
                .iter()
                .any(|origin| origin == "*")
        {
            return Err(herodex_core::Error::InvalidInput(
                "cors.allowed_origins cannot include '*' when debug=false".to_string(),
            ));
        }

        if !self.config.debug && self.config.lists_dir.is_none() {
            return Err(herodex_core::Error::InvalidInput(
                "lists_dir is required when debug=false".to_string(),
            ));
        }

        if self.config.request_timeout_secs == Some(0) {
            return Err(herodex_core::Error::InvalidInput(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.config.concurrency_limit == Some(0) {
            return Err(herodex_core::Error::InvalidInput(
                "concurrency_limit must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing a server.
pub struct ServerBuilder {
    config: Config,
    catalog_source: Option<Arc<dyn DatasetSource>>,
    list_backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field(
                "catalog_source",
                &self.catalog_source.as_ref().map(|s| s.describe()),
            )
            .field("list_backend", &"<StorageBackend>")
            .finish()
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            catalog_source: None,
            list_backend: Arc::new(MemoryBackend::new()),
        }
    }
}

impl ServerBuilder {
    /// Creates a new builder with default configuration and in-memory lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Sets the catalog dataset source.
    ///
    /// Defaults to the JSON files named by the configuration.
    #[must_use]
    pub fn catalog_source(mut self, source: Arc<dyn DatasetSource>) -> Self {
        self.catalog_source = Some(source);
        self
    }

    /// Sets the storage backend holding curated lists.
    #[must_use]
    pub fn list_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.list_backend = backend;
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        let source = self.catalog_source.unwrap_or_else(|| {
            Arc::new(JsonFileSource::new(
                self.config.data.info_path(),
                self.config.data.powers_path(),
            ))
        });
        Server {
            catalog: Arc::new(CatalogStore::from_shared(source)),
            lists: Arc::new(ListStore::new(self.list_backend)),
            config: self.config,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use herodex_catalog::{RawEntity, StaticSource};
    use tower::ServiceExt;

    fn tiny_source() -> Arc<dyn DatasetSource> {
        Arc::new(StaticSource::new(
            vec![RawEntity::new(0, "A-Bomb"), RawEntity::new(1, "Wolverine")],
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn test_health_endpoint() -> Result<()> {
        let server = ServerBuilder::new().build();
        let router = server.test_router();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| match err {})?;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let health: HealthResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert_eq!(health.status, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_ready_endpoint() -> Result<()> {
        let server = ServerBuilder::new().catalog_source(tiny_source()).build();
        let router = server.test_router();

        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| match err {})?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let ready: ReadyResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert!(ready.ready);
        Ok(())
    }

    #[tokio::test]
    async fn test_ready_reports_missing_dataset() -> Result<()> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let mut config = Config::default();
        config.data.dir = dir.path().to_path_buf();
        let router = Server::new(config).test_router();

        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .context("build request")?;
        let response = router.oneshot(request).await.map_err(|err| match err {})?;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .context("read response body")?;
        let ready: ReadyResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert!(!ready.ready);
        assert!(ready.message.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() -> Result<()> {
        let router = ServerBuilder::new().build().test_router();

        let request = Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "trace-me")
            .body(Body::empty())
            .context("build request")?;
        let response = router.oneshot(request).await.map_err(|err| match err {})?;

        let echoed = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .context("request id header")?;
        assert_eq!(echoed.to_str()?, "trace-me");
        Ok(())
    }

    #[test]
    fn test_validate_config_rejects_wildcard_cors_in_production() {
        let mut config = Config {
            lists_dir: Some("lists".into()),
            ..Config::default()
        };
        config.cors.allowed_origins = vec!["*".to_string()];
        let server = Server::new(config);

        let err = server.validate_config().expect_err("wildcard rejected");
        assert!(err.to_string().contains("cors.allowed_origins"));
    }

    #[test]
    fn test_validate_config_requires_lists_dir_in_production() {
        let server = Server::new(Config::default());
        let err = server.validate_config().expect_err("lists dir required");
        assert!(err.to_string().contains("lists_dir"));

        let debug = ServerBuilder::new().debug(true).build();
        assert!(debug.validate_config().is_ok());
    }

    #[test]
    fn test_validate_config_rejects_zero_limits() {
        let server = ServerBuilder::new()
            .debug(true)
            .request_timeout_secs(0)
            .build();
        assert!(server.validate_config().is_err());
    }

    #[test]
    fn test_cors_wildcard_detection() {
        let any = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            max_age_seconds: 60,
        };
        assert!(Server::cors_allows_any_origin(&any));

        let listed = CorsConfig {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_age_seconds: 60,
        };
        assert!(!Server::cors_allows_any_origin(&listed));
        assert_eq!(Server::parse_cors_origins(&listed).len(), 1);
    }
}
