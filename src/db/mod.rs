pub mod common;
pub mod models;
pub mod triggers;
pub mod workflows;
pub mod workloads;

pub use models::*;

use sqlx::PgPool;
use std::time::Instant;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log usage counts for this pool along with a sampled connection
    /// acquisition time. Slow acquisition means the pool is saturated.
    pub async fn log_pool_metrics(&self, pool_name: &str) {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        let started = Instant::now();
        match self.pool.acquire().await {
            Ok(conn) => {
                let elapsed = started.elapsed();
                drop(conn);

                tracing::info!(
                    pool = pool_name,
                    pool_size = size,
                    idle_connections = idle,
                    active_connections = size.saturating_sub(idle),
                    acquisition_ms = elapsed.as_millis(),
                    "Connection pool metrics"
                );

                if elapsed.as_millis() > 10 {
                    tracing::warn!(
                        pool = pool_name,
                        acquisition_ms = elapsed.as_millis(),
                        "Slow connection acquisition"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    pool = pool_name,
                    error = %e,
                    "Failed to acquire connection for metrics sample"
                );
            }
        }
    }
}
