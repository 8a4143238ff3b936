//! # chemviz: Chemical Equipment Visualizer backend
//!
//! `chemviz` ingests CSV files of chemical equipment readings, keeps the most recent upload
//! batches in PostgreSQL, and serves summary statistics, upload history and a printable PDF report
//! over HTTP. Desktop and web front ends talk to it through the JSON API (see [`client`] for a
//! typed Rust client).
//!
//! ## Request Flow
//!
//! An upload (`POST /api/upload/`) is a multipart form with a `file` field. The bytes go through
//! the [`ingest`] pipeline: the header row is mapped onto the five canonical fields
//! (`Equipment Name`, `Type`, `Flowrate`, `Pressure`, `Temperature`) by loose name matching, each
//! row is materialized with defaults for anything missing, and the batch is stored together with
//! its records. In the same transaction, [`retention`] deletes every batch beyond the newest five,
//! so the store never holds more than that after an upload commits.
//!
//! Reads (`/api/summary/`, `/api/history/`, `/api/pdf/`) go straight to the repositories in
//! [`db`], with [`summary`] computing aggregates and [`report`] laying out and rendering the PDF.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use chemviz::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = chemviz::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     chemviz::telemetry::init_telemetry(config.log_format)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded and run on startup:
//!
//! ```no_run
//! # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
//! chemviz::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingest;
mod openapi;
pub mod report;
pub mod retention;
pub mod summary;
pub mod telemetry;
#[cfg(test)]
mod test_utils;
pub mod types;

use crate::{config::CorsOrigin, openapi::ApiDoc};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{delete, get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{EquipmentRecordId, UploadId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the chemviz database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL with the configured pool settings.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(settings.idle_timeout())
        .max_lifetime(settings.max_lifetime())
        .connect(&config.database.url)
        .await?;

    info!(max_connections = settings.max_connections, "Connected to database");
    Ok(pool)
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = &config.cors;

    let mut layer = if cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Url always serializes with a trailing slash; browsers send origins without one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new().allow_origin(origins).allow_credentials(cors.allow_credentials)
    };

    layer = layer
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE])
        .expose_headers([http::header::CONTENT_DISPOSITION]);

    if let Some(max_age) = cors.max_age {
        layer = layer.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(layer)
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/api/*`: Upload, summary, history and report endpoints
/// - `/healthz`: Liveness check
/// - `/docs`: OpenAPI explorer
/// - `/internal/metrics`: Prometheus metrics (when `enable_metrics` is set)
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_limit = usize::try_from(state.config.uploads.max_file_size).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .route(
            "/upload/",
            post(api::handlers::uploads::upload_csv).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/summary/", get(api::handlers::summary::get_summary))
        .route("/history/", get(api::handlers::uploads::list_history))
        .route("/history/{upload_id}/", delete(api::handlers::uploads::delete_upload))
        .route("/pdf/", get(api::handlers::reports::download_report))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    // Add Prometheus metrics if enabled
    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and the database pool.
///
/// 1. **Create**: [`Application::new`] connects to the database and runs migrations
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance, connecting to the configured database
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create a new application instance, optionally reusing an existing pool
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting chemviz with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => setup_database(&config).await?,
        };
        migrator().run(&pool).await?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "chemviz listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{AppState, build_router, create_cors_layer};
    use crate::config::CorsOrigin;
    use crate::test_utils::create_test_config;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_and_docs(pool: PgPool) {
        let state = AppState::builder().db(pool).config(create_test_config()).build();
        let router = build_router(&state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        let response = server.get("/healthz").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), "OK");

        let response = server.get("/docs").await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upload_body_limit(pool: PgPool) {
        let mut config = create_test_config();
        config.uploads.max_file_size = 64;
        let state = AppState::builder().db(pool).config(config).build();
        let server = axum_test::TestServer::new(build_router(&state).unwrap()).unwrap();

        let big = format!("Equipment Name,Flowrate\n{}", "Pump,1\n".repeat(100));
        let response = server
            .post("/api/upload/")
            .multipart(
                axum_test::multipart::MultipartForm::new()
                    .add_part("file", axum_test::multipart::Part::bytes(big.into_bytes()).file_name("big.csv")),
            )
            .await;

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_cors_layer_from_explicit_origins() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Url("http://localhost:3000".parse().unwrap())];
        config.cors.allow_credentials = true;
        assert!(create_cors_layer(&config).is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_allows_any_origin_by_default(pool: PgPool) {
        let state = AppState::builder().db(pool).config(create_test_config()).build();
        let server = axum_test::TestServer::new(build_router(&state).unwrap()).unwrap();

        let response = server
            .get("/api/history/")
            .add_header("origin", "http://desktop.local")
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("access-control-allow-origin"), "*");
    }
}
