//! 常量定义模块

/// JWT相关常量
pub mod jwt {
    pub const JWT_SECRET_MIN_LENGTH: usize = 32;
    pub const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;
    /// Token 有效期上限（10年）
    pub const MAX_TOKEN_EXPIRY_HOURS: i64 = 8760 * 10;
    pub const DEFAULT_ALGORITHM: &str = "HS256";
}

/// 分页相关常量
pub mod pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;
}

/// 缓存相关常量
pub mod cache {
    pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024; // 1MB
    pub const MAX_CACHE_SIZE: usize = 1000;
    pub const SWEEP_INTERVAL_SECONDS: u64 = 60;

    /// 内置缓存配置名
    pub const DEFAULT_10: &str = "Default10";
    pub const DEFAULT_20: &str = "Default20";

    /// 匹配全部查询参数的通配键
    pub const VARY_BY_ALL_QUERY_KEYS: &str = "*";

    pub const X_CACHE_HEADER: &str = "x-cache";
}

/// 跨域相关常量
pub mod cors {
    pub const WILDCARD: &str = "*";
    pub const DEFAULT_MAX_AGE_SECONDS: u64 = 600;
    pub const DEFAULT_ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "OPTIONS"];
    pub const DEFAULT_ALLOWED_HEADERS: &[&str] = &["authorization", "content-type"];
}

/// 角色相关常量
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

/// HTTP相关常量
pub mod http {
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
    pub const RETRY_AFTER_SECONDS: u64 = 5;
}
