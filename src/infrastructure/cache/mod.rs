//! 响应缓存基础设施模块
//!
//! 按命名的缓存配置（CacheProfile）决定响应能否复用：
//! - shared: 服务端共享缓存 + `Cache-Control: public`
//! - private: 只下发 `Cache-Control: private`，服务端不存储
//! - none: `Cache-Control: no-store`

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::infrastructure::config::{CacheProfileConfig, ConfigError};
use crate::shared::constants::cache::VARY_BY_ALL_QUERY_KEYS;

pub mod profile_engine;

// 重新导出主要类型
pub use profile_engine::{CacheProfileEngine, StoreOutcome};

/// 缓存位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLocation {
    #[default]
    Shared,
    Private,
    None,
}

/// 命名缓存配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheProfile {
    name: String,
    duration: Duration,
    vary_by_query_keys: BTreeSet<String>,
    location: CacheLocation,
}

impl CacheProfile {
    pub fn new(
        name: impl Into<String>,
        duration: Duration,
        vary_by_query_keys: &[&str],
        location: CacheLocation,
    ) -> Self {
        Self {
            name: name.into(),
            duration,
            vary_by_query_keys: vary_by_query_keys.iter().map(|k| k.to_string()).collect(),
            location,
        }
    }

    pub fn from_config(config: &CacheProfileConfig) -> Self {
        Self {
            name: config.name.clone(),
            duration: Duration::from_secs(config.duration_seconds),
            vary_by_query_keys: config.vary_by_query_keys.iter().cloned().collect(),
            location: config.location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn location(&self) -> CacheLocation {
        self.location
    }

    /// 是否允许写入服务端共享缓存
    pub fn is_server_cacheable(&self) -> bool {
        self.location == CacheLocation::Shared && !self.duration.is_zero()
    }

    /// 生成 `Cache-Control` 响应头的值
    pub fn cache_control(&self) -> String {
        let seconds = self.duration.as_secs();
        match self.location {
            CacheLocation::Shared => format!("public,max-age={}", seconds),
            CacheLocation::Private => format!("private,max-age={}", seconds),
            CacheLocation::None => "no-store".to_string(),
        }
    }

    /// 从查询参数中挑出参与缓存键的部分，按键值排序
    pub fn vary_values(&self, query: &[(String, String)]) -> Vec<(String, String)> {
        let all = self.vary_by_query_keys.contains(VARY_BY_ALL_QUERY_KEYS);
        let mut selected: Vec<(String, String)> = query
            .iter()
            .filter(|(key, _)| all || self.vary_by_query_keys.contains(key))
            .cloned()
            .collect();
        selected.sort();
        selected
    }
}

/// 启动时注册的缓存配置集合，之后只读
#[derive(Debug, Clone, Default)]
pub struct CacheProfileSet {
    profiles: HashMap<String, Arc<CacheProfile>>,
}

impl CacheProfileSet {
    pub fn new(profiles: Vec<CacheProfile>) -> Result<Self, ConfigError> {
        let mut map = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            let name = profile.name.clone();
            if map.insert(name.clone(), Arc::new(profile)).is_some() {
                return Err(ConfigError::DuplicateCacheProfile(name));
            }
        }
        Ok(Self { profiles: map })
    }

    pub fn from_config(configs: &[CacheProfileConfig]) -> Result<Self, ConfigError> {
        Self::new(configs.iter().map(CacheProfile::from_config).collect())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CacheProfile>> {
        self.profiles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// 缓存键：路由路径（区分大小写）+ 参与变化的查询参数
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub route: String,
    pub vary_values: Vec<(String, String)>,
}

/// 缓存条目，只会整体替换，不会原地修改
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub stored_at: Instant,
    pub profile_name: String,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    pub fn is_expired(&self, now: Instant, duration: Duration) -> bool {
        self.age(now) >= duration
    }
}

/// 缓存查找结果
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Arc<CacheEntry>),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheLookup::Miss)
    }
}

/// 缓存指标统计
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_cache_control_per_location() {
        let shared = CacheProfile::new("a", Duration::from_secs(10), &[], CacheLocation::Shared);
        let private = CacheProfile::new("b", Duration::from_secs(20), &[], CacheLocation::Private);
        let none = CacheProfile::new("c", Duration::from_secs(30), &[], CacheLocation::None);

        assert_eq!(shared.cache_control(), "public,max-age=10");
        assert_eq!(private.cache_control(), "private,max-age=20");
        assert_eq!(none.cache_control(), "no-store");

        assert!(shared.is_server_cacheable());
        assert!(!private.is_server_cacheable());
        assert!(!none.is_server_cacheable());
    }

    #[test]
    fn test_zero_duration_is_not_server_cacheable() {
        let profile = CacheProfile::new("zero", Duration::ZERO, &[], CacheLocation::Shared);
        assert!(!profile.is_server_cacheable());
    }

    #[test]
    fn test_vary_values_selects_and_sorts() {
        let profile = CacheProfile::new("p", Duration::from_secs(10), &["size", "page"], CacheLocation::Shared);
        let selected = profile.vary_values(&query(&[("utm", "x"), ("size", "5"), ("page", "2")]));
        assert_eq!(selected, query(&[("page", "2"), ("size", "5")]));
    }

    #[test]
    fn test_vary_by_all_keys() {
        let profile = CacheProfile::new("p", Duration::from_secs(10), &["*"], CacheLocation::Shared);
        let selected = profile.vary_values(&query(&[("q", "mesa"), ("page", "1")]));
        assert_eq!(selected, query(&[("page", "1"), ("q", "mesa")]));
    }

    #[test]
    fn test_no_vary_keys_ignores_query() {
        let profile = CacheProfile::new("p", Duration::from_secs(10), &[], CacheLocation::Shared);
        assert!(profile.vary_values(&query(&[("page", "1")])).is_empty());
    }

    #[test]
    fn test_profile_set_rejects_duplicates() {
        let result = CacheProfileSet::new(vec![
            CacheProfile::new("Default10", Duration::from_secs(10), &[], CacheLocation::Shared),
            CacheProfile::new("Default10", Duration::from_secs(20), &[], CacheLocation::Shared),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateCacheProfile(_))));
    }

    #[test]
    fn test_profile_set_lookup() {
        let set = CacheProfileSet::new(vec![
            CacheProfile::new("Default10", Duration::from_secs(10), &[], CacheLocation::Shared),
        ])
        .unwrap();
        assert!(set.contains("Default10"));
        assert!(set.get("Default20").is_none());
        assert_eq!(set.len(), 1);
    }
}
