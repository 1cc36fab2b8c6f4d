//! HTTP请求处理器模块
//!
//! 处理器只负责解析请求和组装响应，业务规则都在仓储层。

pub mod categories;
pub mod health;
pub mod products;
pub mod users;
