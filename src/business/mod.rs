//! 业务层模块
//!
//! 包含领域模型以及实体与API形状之间的映射

pub mod domain;
pub mod mapping;

// 重新导出常用类型
pub use domain::{Category, Entity, Product, Role, User};
