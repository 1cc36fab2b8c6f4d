//! 仓储层
//!
//! 每个请求构造一次的无状态门面：负责调用映射函数、校验必填字段，
//! 并把存储层的结果翻译成 `NotFound` / `Validation` / `Conflict`。
//! 仓储从不缓存实体。

pub mod category_repository;
pub mod product_repository;
pub mod user_repository;

use thiserror::Error;

use crate::infrastructure::database::StorageError;
use crate::shared::types::{EntityId, PaginationParams};

pub use category_repository::CategoryRepository;
pub use product_repository::ProductRepository;
pub use user_repository::UserRepository;

/// 仓储层错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity} {id} 不存在")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("数据冲突: {0}")]
    Conflict(String),

    #[error("存储暂时不可用: {0}")]
    StorageUnavailable(String),

    #[error("存储错误: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: EntityId) -> Self {
        RepositoryError::NotFound { entity, id }
    }
}

impl From<StorageError> for RepositoryError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Conflict(msg) => RepositoryError::Conflict(msg),
            StorageError::Unavailable(msg) => RepositoryError::StorageUnavailable(msg),
            StorageError::Backend(msg) => RepositoryError::Storage(msg),
        }
    }
}

/// 分页参数校验
pub(crate) fn check_pagination(params: &PaginationParams) -> Result<(), RepositoryError> {
    params.validate().map_err(RepositoryError::Validation)
}
