//! 基础设施层模块
//!
//! 负责配置加载、存储协作者、仓储门面和响应缓存

pub mod cache;
pub mod config;
pub mod database;
pub mod repositories;

// 重新导出常用类型和错误
pub use config::{Config, ConfigError};
pub use database::{Database, DatabaseError};
pub use repositories::RepositoryError;
