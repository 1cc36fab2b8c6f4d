//! 路由注册表
//!
//! `(方法, 路由模板) → {访问要求, 缓存配置}`，启动时登记，之后只读。
//! 未登记的路由按"需要认证、任意角色、不缓存"处理。

use std::collections::HashMap;

use axum::http::Method;

use crate::auth::Access;
use crate::infrastructure::cache::CacheProfileSet;
use crate::infrastructure::config::ConfigError;

/// 单个端点的处理策略
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutePolicy {
    pub access: Access,
    pub cache_profile: Option<String>,
}

impl RoutePolicy {
    pub fn anonymous() -> Self {
        Self { access: Access::Anonymous, cache_profile: None }
    }

    pub fn authenticated() -> Self {
        Self { access: Access::any_user(), cache_profile: None }
    }

    pub fn roles(roles: &[&str]) -> Self {
        Self { access: Access::roles(roles), cache_profile: None }
    }

    pub fn cached(mut self, profile: &str) -> Self {
        self.cache_profile = Some(profile.to_string());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(Method, String), RoutePolicy>,
    fallback: RoutePolicy,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Method, pattern: &str, policy: RoutePolicy) {
        if self.routes.insert((method.clone(), pattern.to_string()), policy).is_some() {
            tracing::warn!("路由策略被覆盖: {} {}", method, pattern);
        }
    }

    /// 查找策略；HEAD 复用 GET 的登记
    pub fn resolve(&self, method: &Method, pattern: Option<&str>) -> &RoutePolicy {
        let Some(pattern) = pattern else {
            return &self.fallback;
        };
        let key_method = if method == Method::HEAD { Method::GET } else { method.clone() };
        self.routes
            .get(&(key_method, pattern.to_string()))
            .unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 所有引用的缓存配置都必须已注册
    pub fn validate_profiles(&self, profiles: &CacheProfileSet) -> Result<(), ConfigError> {
        for ((method, pattern), policy) in &self.routes {
            if let Some(name) = &policy.cache_profile {
                if !profiles.contains(name) {
                    tracing::error!("❌ 路由 {} {} 引用了未注册的缓存配置 {}", method, pattern, name);
                    return Err(ConfigError::UnknownCacheProfile(name.clone()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::{CacheLocation, CacheProfile};
    use std::time::Duration;

    #[test]
    fn test_unregistered_route_requires_authentication() {
        let table = RouteTable::new();
        let policy = table.resolve(&Method::GET, Some("/api/unknown"));
        assert_eq!(policy.access, Access::any_user());
        assert!(policy.cache_profile.is_none());
    }

    #[test]
    fn test_head_uses_get_policy() {
        let mut table = RouteTable::new();
        table.register(Method::GET, "/api/products", RoutePolicy::anonymous().cached("Default20"));
        let policy = table.resolve(&Method::HEAD, Some("/api/products"));
        assert_eq!(policy.access, Access::Anonymous);
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        let profiles = CacheProfileSet::new(vec![CacheProfile::new(
            "Default10",
            Duration::from_secs(10),
            &[],
            CacheLocation::Shared,
        )])
        .unwrap();

        let mut table = RouteTable::new();
        table.register(Method::GET, "/a", RoutePolicy::anonymous().cached("Default10"));
        assert!(table.validate_profiles(&profiles).is_ok());

        table.register(Method::GET, "/b", RoutePolicy::anonymous().cached("Missing"));
        assert!(matches!(
            table.validate_profiles(&profiles),
            Err(ConfigError::UnknownCacheProfile(name)) if name == "Missing"
        ));
    }
}
