//! Router configuration for the media gateway.
//!
//! # Route Structure
//!
//! ```text
//! /health          - Health check (public)
//! /{*path}         - Protected objects (GET, HEAD, OPTIONS)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use media_gateway::gateway::{create_router, RouterConfig};
//! use media_gateway::store::S3ObjectStore;
//!
//! let store = S3ObjectStore::new(client, "media-bucket".to_string());
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origins(vec!["https://learn.example.com".to_string()]);
//!
//! let router = create_router(store, config)?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, ETAG, IF_MATCH, IF_MODIFIED_SINCE,
    IF_NONE_MATCH, IF_UNMODIFIED_SINCE, LAST_MODIFIED, RANGE,
};
use http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, object_handler, options_handler, AppState};
use crate::clock::{Clock, SystemClock};
use crate::error::ConfigurationError;
use crate::grant::GrantVerifier;
use crate::store::ObjectStore;

/// How long browsers may cache a preflight answer.
pub const CORS_MAX_AGE: Duration = Duration::from_secs(86400);

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared secret grants are verified against
    pub auth_secret: String,

    /// Origins allowed to read responses cross-origin (empty = no CORS headers)
    pub cors_origins: Vec<String>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Time source for expiry checks
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("cors_origins", &self.cors_origins)
            .field("enable_tracing", &self.enable_tracing)
            .finish_non_exhaustive()
    }
}

impl RouterConfig {
    /// Create a new router configuration with the given secret.
    ///
    /// By default:
    /// - No cross-origin access
    /// - Tracing is enabled
    /// - The wall clock is used
    pub fn new(auth_secret: impl Into<String>) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            cors_origins: Vec::new(),
            enable_tracing: true,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the gateway router.
///
/// Every object request is authorized independently from its own query
/// string; the router holds no per-grant state.
///
/// # Errors
///
/// Returns [`ConfigurationError::MissingSecret`] when the secret is empty.
pub fn create_router<S>(store: S, config: RouterConfig) -> Result<Router, ConfigurationError>
where
    S: ObjectStore + 'static,
{
    let verifier =
        GrantVerifier::new(&config.auth_secret)?.with_clock(Arc::clone(&config.clock));
    let app_state = AppState::new(store, verifier);

    let object_routes = Router::new()
        .route(
            "/{*path}",
            get(object_handler::<S>).options(options_handler),
        )
        .with_state(app_state);

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(object_routes);

    let router = match build_cors_layer(&config) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    if config.enable_tracing {
        Ok(router.layer(TraceLayer::new_for_http()))
    } else {
        Ok(router)
    }
}

/// Build the CORS layer, or `None` when no origin is allowed.
///
/// Only exact, allow-listed origins receive CORS headers. Preflights are
/// answered by the layer itself without touching authorization.
fn build_cors_layer(config: &RouterConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers([
                RANGE,
                IF_NONE_MATCH,
                IF_MODIFIED_SINCE,
                IF_MATCH,
                IF_UNMODIFIED_SINCE,
            ])
            .expose_headers([CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES, ETAG, LAST_MODIFIED])
            .max_age(CORS_MAX_AGE),
    )
}

// =============================================================================
// Tests
// =============================================================================
