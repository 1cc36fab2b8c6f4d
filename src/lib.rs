//! 商城 API 服务
//!
//! 分类、商品、用户的 REST 接口，请求经过跨域、认证、授权、响应缓存组成的管道

// 核心模块
pub mod auth; // 认证和授权模块
pub mod business; // 业务层（领域模型、DTO映射）
pub mod infrastructure; // 基础设施层（配置、存储、仓储、缓存）
pub mod presentation; // 表示层（管道、路由、处理器）
pub mod shared; // 共享模块（错误处理、类型定义、工具函数）

// 重新导出核心类型
pub use infrastructure::{Config, Database};
pub use presentation::{create_routes, AppComponents, AppState};
pub use shared::{AppError, AppResult};
