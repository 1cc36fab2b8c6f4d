pub mod connection;
pub mod memory_store;
pub mod postgres_store;
pub mod store;

use std::sync::Arc;

use tracing::info;

use crate::business::domain::{Category, Product, User};
use crate::infrastructure::config::Config;
use connection::{DatabaseConnection, DatabaseConnectionError, PoolStats};
pub use memory_store::MemoryStore;
pub use postgres_store::PgStore;
pub use store::{
    CategoryStorage, CategoryStore, EntityStore, ProductStorage, ProductStore, StorageError, UserStorage,
    UserStore,
};

/// 分类/商品之间引用检查的写锁
///
/// "检查分类存在再写商品" 与 "检查分类为空再删除" 必须互斥，
/// 否则并发时会留下引用已删除分类的商品。PostgreSQL 另有外键兜底。
pub type CatalogLock = Arc<tokio::sync::Mutex<()>>;

/// 数据库错误类型
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("连接管理器错误: {0}")]
    ConnectionManager(#[from] DatabaseConnectionError),

    #[error("SQL执行错误: {0}")]
    Sql(#[from] sqlx::Error),
}

/// 存储协作者集合
///
/// 配置了连接串时使用 PostgreSQL，否则退回内存存储。
#[derive(Clone)]
pub struct Database {
    connection: Option<DatabaseConnection>,
    pub categories: CategoryStore,
    pub products: ProductStore,
    pub users: UserStore,
    catalog_lock: CatalogLock,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("backend", &self.backend()).finish()
    }
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self, DatabaseError> {
        let Some(url) = config.database_url.as_deref().filter(|_| config.has_database()) else {
            info!("💾 未配置 DATABASE_URL，使用内存存储");
            return Ok(Self::in_memory());
        };

        let connection = DatabaseConnection::new(url, &config.database).await?;
        let store = Arc::new(PgStore::new(connection.pool().clone()));

        let database = Self {
            connection: Some(connection),
            categories: store.clone(),
            products: store.clone(),
            users: store,
            catalog_lock: CatalogLock::default(),
        };

        if !database.check_tables().await? {
            tracing::warn!("⚠️ 数据库中缺少 categories/products/users 表，请先建表");
        }
        Ok(database)
    }

    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(MemoryStore::<Category>::new()),
            Arc::new(MemoryStore::<Product>::new()),
            Arc::new(MemoryStore::<User>::new()),
        )
    }

    /// 直接注入存储实现（测试中用于替换协作者）
    pub fn from_stores(categories: CategoryStore, products: ProductStore, users: UserStore) -> Self {
        Self {
            connection: None,
            categories,
            products,
            users,
            catalog_lock: CatalogLock::default(),
        }
    }

    /// 同一个 Database（及其克隆）共享的分类引用写锁
    pub fn catalog_lock(&self) -> CatalogLock {
        self.catalog_lock.clone()
    }

    pub fn backend(&self) -> &'static str {
        if self.connection.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    pub async fn health_check(&self) -> Result<bool, DatabaseError> {
        match &self.connection {
            Some(connection) => Ok(connection.health_check().await?),
            None => Ok(true),
        }
    }

    pub async fn pool_stats(&self) -> Option<PoolStats> {
        match &self.connection {
            Some(connection) => Some(connection.pool_stats().await),
            None => None,
        }
    }

    /// 检查三张业务表是否存在
    pub async fn check_tables(&self) -> Result<bool, DatabaseError> {
        let Some(connection) = &self.connection else {
            return Ok(true);
        };
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name IN ('categories', 'products', 'users')",
        )
        .fetch_one(connection.pool())
        .await?;
        Ok(count == 3)
    }

    pub async fn close(&self) {
        if let Some(connection) = &self.connection {
            connection.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_url_uses_memory_backend() {
        let config = Config::default();
        let database = Database::new(&config).await.unwrap();
        assert_eq!(database.backend(), "memory");
        assert!(database.health_check().await.unwrap());
        assert!(database.pool_stats().await.is_none());
    }
}
