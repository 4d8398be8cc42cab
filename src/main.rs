use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod engine;
mod error;
mod oracle;
mod policy;
mod runner;
mod security;
mod service;
mod solver;

pub use db::Database;

use config::AppConfig;
use engine::HttpEngineClient;
use oracle::PriceOracle;

pub struct AppState {
    pub db: Database,    // API handlers (short-lived requests)
    pub db_bg: Database, // Periodic scheduler loops
    pub config: AppConfig,
    pub engine: Arc<dyn engine::EngineClient>,
    pub oracle: PriceOracle,
}

/// Delay Tolerant Workload Scheduler API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DTW Scheduler API",
        version = "1.0.0",
        description = "Deadline-driven scheduling of deferrable workflow executions"
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    paths(
        // Health
        api::health::health,
        // Delay tolerant workloads
        api::workloads::handlers::create_workload,
        api::workloads::handlers::get_workload,
        api::workloads::handlers::list_workloads,
        api::workloads::handlers::delete_workload,
        // Workflows
        api::workflows::handlers::register_workflow,
        api::workflows::handlers::get_workflow,
    ),
    components(
        schemas(
            // Common
            api::common::ErrorResponse,
            // Health
            api::health::HealthResponse,
            // Delay tolerant workloads
            service::CreateWorkloadRequest,
            api::workloads::handlers::WorkloadResponse,
            api::workloads::handlers::ListWorkloadsResponse,
            // Workflows
            api::workflows::handlers::RegisterWorkflowRequest,
            api::workflows::handlers::WorkflowResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Delay Tolerant Workloads", description = "Deadline-driven deferrable workflow executions"),
        (name = "Workflows", description = "Workflow definition management"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    // Check if dev mode is enabled
    let dev_mode = std::env::var("DTW_DEV_MODE")
        .unwrap_or_else(|_| "false".to_string())
        .to_lowercase()
        == "true";

    // Initialize tracing subscriber
    // Always use fmt subscriber for logs, optionally add console subscriber in dev mode
    if dev_mode {
        let console_layer = console_subscriber::ConsoleLayer::builder()
            .server_addr(([127, 0, 0, 1], 6669)) // Default tokio-console port
            .spawn();

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(console_layer)
            .init();

        tracing::info!("Tokio console enabled (connect with: tokio-console)");
    } else {
        // In production: use fmt subscriber with stdout and env filter
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
            )
            .init();
    }

    let app_config = AppConfig::from_env();

    let pool_api = PgPoolOptions::new()
        .max_connections(app_config.pool_api_max)
        .min_connections(2)
        .connect(&app_config.database_url)
        .await?;

    let pool_bg = PgPoolOptions::new()
        .max_connections(app_config.pool_bg_max)
        .min_connections(2)
        .connect(&app_config.database_url)
        .await?;

    tracing::info!(
        api_max = app_config.pool_api_max,
        bg_max = app_config.pool_bg_max,
        "Connected to database with 2 connection pools"
    );

    // Run migrations on the API pool only (migrations only need to run once)
    sqlx::migrate!("./migrations").run(&pool_api).await?;
    tracing::info!("Migrations complete");

    let db = Database::new(pool_api);
    let db_bg = Database::new(pool_bg);

    let engine_client = Arc::new(HttpEngineClient::new(app_config.engine_url.clone()));
    let price_oracle = PriceOracle::new(app_config.energy_price_url.clone());

    let bind_address = app_config.bind_address.clone();

    let state = Arc::new(AppState {
        db,
        db_bg,
        config: app_config,
        engine: engine_client,
        oracle: price_oracle,
    });

    // Background task to log connection pool metrics (dev mode only)
    if dev_mode {
        let pool_metrics_state = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;

                pool_metrics_state.db.log_pool_metrics("api").await;
                pool_metrics_state.db_bg.log_pool_metrics("bg").await;
            }
        });
    }

    // The scheduler loops: cron trigger advancement and workload placement
    runner::spawn_periodic_tasks(state.clone());

    let app = Router::new()
        // OpenAPI documentation
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::health))
        // Delay tolerant workload endpoints
        .route(
            "/v2/delay_tolerant_workload",
            post(api::workloads::create_workload).get(api::workloads::list_workloads),
        )
        .route(
            "/v2/delay_tolerant_workload/:name",
            get(api::workloads::get_workload).delete(api::workloads::delete_workload),
        )
        // Workflow definition endpoints
        .route("/v2/workflows", post(api::workflows::register_workflow))
        .route(
            "/v2/workflows/:identifier",
            get(api::workflows::get_workflow),
        )
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("DTW scheduler listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
