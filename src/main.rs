use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jobfeed_import::app_state::AppState;
use jobfeed_import::config::AppConfig;
use jobfeed_import::db;
use jobfeed_import::routes;
use jobfeed_import::services::{fetcher::FeedFetcher, queue::RedisQueue};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing jobfeed-import server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("import_runs_started_total", "Import runs started");
    metrics::describe_counter!("import_runs_completed_total", "Import runs completed");
    metrics::describe_counter!(
        "import_runs_failed_total",
        "Import runs that failed during fetch or dispatch"
    );
    metrics::describe_counter!("import_items_created_total", "Feed items inserted as new jobs");
    metrics::describe_counter!(
        "import_items_updated_total",
        "Feed items that updated an existing job"
    );
    metrics::describe_counter!("import_items_failed_total", "Feed items that failed to import");
    metrics::describe_gauge!(
        "import_queue_depth",
        "Current number of batches waiting in the queue"
    );
    metrics::describe_histogram!(
        "import_batch_processing_seconds",
        "Time to process one queued batch"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize feed fetcher
    let fetcher =
        FeedFetcher::new(config.fetch_timeout_ms).expect("Failed to initialize feed fetcher");

    // Initialize Redis batch queue
    tracing::info!("Connecting to Redis batch queue");
    let queue = RedisQueue::new(&config.redis_url).expect("Failed to initialize batch queue");

    let bind_addr = config.bind_addr.clone();

    // Create shared application state
    let state = AppState::new(db_pool, config, fetcher, Arc::new(queue));

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/import", post(routes::import::trigger_import))
        .route("/api/v1/runs", get(routes::runs::list_runs))
        .route("/api/v1/runs/stale", get(routes::runs::stale_runs))
        .route("/api/v1/runs/{run_id}", get(routes::runs::get_run))
        .route("/api/v1/jobs", get(routes::jobs::list_jobs))
        .route("/api/v1/stats", get(routes::stats::stats))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // import trigger bodies are tiny

    tracing::info!("Starting jobfeed-import on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
