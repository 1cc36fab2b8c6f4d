//! 健康检查处理器

use std::collections::HashMap;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::infrastructure::cache::CacheMetrics;
use crate::infrastructure::database::connection::PoolStats;
use crate::presentation::routes::AppState;

/// 系统健康状态
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub checks: HashMap<&'static str, HealthCheck>,
    pub cache: CacheMetrics,
    pub cache_hit_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

/// 单项健康检查结果
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// 基础健康检查（匿名）
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let storage = match state.database.health_check().await {
        Ok(_) => HealthCheck {
            status: "healthy",
            response_time_ms: started.elapsed().as_millis() as u64,
            details: Some(state.database.backend().to_string()),
        },
        Err(e) => {
            warn!("🏥 存储健康检查失败: {}", e);
            HealthCheck {
                status: "unhealthy",
                response_time_ms: started.elapsed().as_millis() as u64,
                details: Some(e.to_string()),
            }
        }
    };

    let healthy = storage.status == "healthy";
    let mut checks = HashMap::new();
    checks.insert("storage", storage);

    let cache = state.pipeline.cache.metrics().await;
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
        cache_hit_rate: cache.hit_rate(),
        cache,
        pool: state.database.pool_stats().await,
    };

    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(response))
}
