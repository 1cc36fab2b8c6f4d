//! 表示层模块
//!
//! 负责HTTP路由、请求处理管道和处理器

pub mod extract;
pub mod handlers;
pub mod pipeline;
pub mod routes;

// 重新导出路由创建函数
pub use routes::{create_routes, AppComponents, AppState};
