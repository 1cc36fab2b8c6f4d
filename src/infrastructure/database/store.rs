//! 存储协作者接口
//!
//! 每种实体按ID提供增删改查；实体特有的查询放在扩展 trait 中。

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::business::domain::{Category, Entity, Product, User};
use crate::shared::types::{CategoryId, EntityId, ProductId};

/// 存储层错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 唯一性或引用约束冲突
    #[error("存储约束冲突: {0}")]
    Conflict(String),

    /// 存储暂时不可用（调用方可重试）
    #[error("存储不可用: {0}")]
    Unavailable(String),

    /// 其他存储故障
    #[error("存储错误: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
                StorageError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(error.to_string())
            }
            _ => StorageError::Backend(error.to_string()),
        }
    }
}

/// 通用实体存储
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// 插入实体，返回带存储分配ID的副本
    async fn insert(&self, entity: E) -> Result<E, StorageError>;

    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, StorageError>;

    /// 按ID升序分页
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<E>, StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;

    /// 整体替换，ID不存在时返回 None
    async fn update(&self, entity: E) -> Result<Option<E>, StorageError>;

    /// 删除，返回是否确实删除了记录
    async fn delete(&self, id: EntityId) -> Result<bool, StorageError>;
}

/// 分类特有查询
#[async_trait]
pub trait CategoryStorage: EntityStore<Category> {
    /// 按名称查找（不区分大小写）
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, StorageError>;
}

/// 商品特有查询
#[async_trait]
pub trait ProductStorage: EntityStore<Product> {
    /// 按SKU查找（不区分大小写）
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StorageError>;

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StorageError>;

    async fn count_by_category(&self, category_id: CategoryId) -> Result<u64, StorageError>;

    /// 名称模糊搜索（不区分大小写）
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StorageError>;

    /// 原子扣减库存；库存不足返回 Conflict，商品不存在返回 None
    async fn decrement_stock(&self, id: ProductId, quantity: i32) -> Result<Option<Product>, StorageError>;
}

/// 用户特有查询
#[async_trait]
pub trait UserStorage: EntityStore<User> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;
}

pub type CategoryStore = Arc<dyn CategoryStorage>;
pub type ProductStore = Arc<dyn ProductStorage>;
pub type UserStore = Arc<dyn UserStorage>;
