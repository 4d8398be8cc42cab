// Library entry point for tests
pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod policy;
pub mod runner;
pub mod security;
pub mod service;
pub mod solver;

pub use db::Database;

use std::sync::Arc;

pub struct AppState {
    pub db: Database,    // API handlers (short-lived requests)
    pub db_bg: Database, // Periodic scheduler loops
    pub config: config::AppConfig,
    pub engine: Arc<dyn engine::EngineClient>,
    pub oracle: oracle::PriceOracle,
}
