//! Fintrack Web Server
//!
//! Axum-based API behind the upload dashboard. Every request carries its
//! own file; nothing is stored between requests.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Upload size limits
//! - Security headers on every response
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use fintrack_core::{Config, Pipeline, PipelineConfig};

mod handlers;

/// Slack on top of the file limit for multipart framing and text fields
const FORM_OVERHEAD: usize = 64 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Largest accepted file, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            allowed_origins: config.server.allowed_origins.clone(),
            max_upload_bytes: config.server.max_upload_bytes(),
        }
    }
}

/// Shared application state. Read-only; every upload gets a fresh run.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: ServerConfig,
}

/// Create the application router
pub fn create_router(pipeline: Pipeline, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let body_limit = config.max_upload_bytes.saturating_add(FORM_OVERHEAD);
    let cors = cors_layer(&config.allowed_origins);

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        config,
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/columns", post(handlers::preview_columns))
        .route("/analyze", post(handlers::analyze))
        .route("/export/csv", post(handlers::export_csv))
        .route("/export/report", post(handlers::export_report))
        .layer(DefaultBodyLimit::max(body_limit));

    // CSP: restrict scripts to same-origin, allow inline styles for charts
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve the dashboard assets if a directory was provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        return base;
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    base.allow_origin(origins)
}

/// Start the server with configuration loaded from files and environment
pub async fn serve(
    config: &Config,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::from(config));
    serve_with_config(pipeline, host, port, static_dir, ServerConfig::from(config)).await
}

/// Start the server with an explicit pipeline and server configuration
pub async fn serve_with_config(
    pipeline: Pipeline,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    info!(
        "Upload limit {} MB, {} keyword(s), top {} categories",
        config.max_upload_bytes / 1024 / 1024,
        pipeline.config().keywords.len(),
        pipeline.config().top_n
    );
    if !config.allowed_origins.is_empty() {
        info!("CORS origins: {}", config.allowed_origins.join(", "));
    }

    let app = create_router(pipeline, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "request",
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn payload_too_large(max_bytes: usize) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            kind: "request",
            message: format!(
                "File too large. Maximum size is {} MB",
                max_bytes / 1024 / 1024
            ),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a pipeline error: problems with the upload are reported to the
    /// client verbatim, anything else becomes a generic 500
    pub fn from_pipeline(err: fintrack_core::Error) -> Self {
        if err.is_input_error() {
            Self {
                status: StatusCode::BAD_REQUEST,
                kind: err.kind(),
                message: err.to_string(),
                internal: None,
            }
        } else {
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                kind: "internal",
                message: "An internal error occurred".to_string(),
                internal: Some(err.into()),
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
