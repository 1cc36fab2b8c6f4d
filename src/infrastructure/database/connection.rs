use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tokio::sync::RwLock;

use crate::infrastructure::config::DatabaseConfig;

/// 连接池状态快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub failed_health_checks: u64,
    pub last_health_check: chrono::DateTime<chrono::Utc>,
    pub health_check_success: bool,
}

/// 数据库连接错误类型
#[derive(Debug, thiserror::Error)]
pub enum DatabaseConnectionError {
    #[error("连接池配置错误: {0}")]
    Configuration(String),

    #[error("数据库连接失败: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("健康检查失败: {0}")]
    HealthCheckFailed(String),
}

/// PostgreSQL 连接池管理
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
    stats: Arc<RwLock<PoolStats>>,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, config: &DatabaseConfig) -> Result<Self, DatabaseConnectionError> {
        Self::validate_config(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
            .test_before_acquire(config.test_before_acquire)
            .connect(database_url)
            .await?;

        let connection = Self {
            pool,
            stats: Arc::new(RwLock::new(PoolStats {
                size: config.min_connections,
                idle: config.min_connections,
                failed_health_checks: 0,
                last_health_check: chrono::Utc::now(),
                health_check_success: false,
            })),
        };

        connection.health_check().await?;

        tracing::info!(
            "数据库连接池初始化成功 - max: {}, min: {}",
            config.max_connections,
            config.min_connections
        );

        Ok(connection)
    }

    fn validate_config(config: &DatabaseConfig) -> Result<(), DatabaseConnectionError> {
        if config.max_connections == 0 {
            return Err(DatabaseConnectionError::Configuration("最大连接数必须大于0".to_string()));
        }
        if config.min_connections > config.max_connections {
            return Err(DatabaseConnectionError::Configuration(
                "最小连接数不能大于最大连接数".to_string(),
            ));
        }
        if config.acquire_timeout_seconds == 0 {
            return Err(DatabaseConnectionError::Configuration(
                "连接获取超时时间必须大于0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行 `SELECT 1` 并记录结果
    pub async fn health_check(&self) -> Result<bool, DatabaseConnectionError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT 1 AS health_check").fetch_one(&self.pool).await;
        let elapsed = start.elapsed();

        let mut stats = self.stats.write().await;
        stats.last_health_check = chrono::Utc::now();

        match result {
            Ok(row) => {
                let _: i32 = row.get("health_check");
                stats.health_check_success = true;
                tracing::debug!("数据库健康检查成功 - 响应时间: {:?}", elapsed);
                Ok(true)
            }
            Err(e) => {
                stats.health_check_success = false;
                stats.failed_health_checks += 1;
                tracing::error!("数据库健康检查失败 - 响应时间: {:?}, 错误: {:?}", elapsed, e);
                Err(DatabaseConnectionError::HealthCheckFailed(e.to_string()))
            }
        }
    }

    pub async fn pool_stats(&self) -> PoolStats {
        let mut stats = self.stats.write().await;
        stats.size = self.pool.size();
        stats.idle = self.pool.num_idle() as u32;
        stats.clone()
    }

    pub async fn close(&self) {
        tracing::info!("正在关闭数据库连接池...");
        self.pool.close().await;
        tracing::info!("数据库连接池已关闭");
    }
}
