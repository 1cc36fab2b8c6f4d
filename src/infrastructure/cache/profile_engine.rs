//! 缓存配置引擎
//!
//! 负责命名缓存配置的解析、共享响应缓存的查找与写入。
//! 条目以 `Arc<CacheEntry>` 整体替换，读者永远看不到写了一半的条目。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CacheEntry, CacheKey, CacheLookup, CacheMetrics, CacheProfile, CacheProfileSet};
use crate::infrastructure::config::{CacheConfig, ConfigError};

/// 写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    /// 配置不存在或不允许服务端缓存
    NotCacheable,
    /// 响应体超过上限
    TooLarge,
}

/// 缓存配置引擎
#[derive(Debug)]
pub struct CacheProfileEngine {
    profiles: CacheProfileSet,
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    max_entries: usize,
    max_body_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,
}

impl CacheProfileEngine {
    pub fn new(profiles: CacheProfileSet, max_entries: usize, max_body_bytes: usize) -> Self {
        Self {
            profiles,
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            max_body_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// 从缓存配置构建
    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        let profiles = CacheProfileSet::from_config(&config.profiles)?;
        info!("缓存配置已注册: {} 个", profiles.len());
        Ok(Self::new(profiles, config.max_entries, config.max_body_bytes))
    }

    /// 按名称获取缓存配置（只读）
    pub fn profile(&self, name: &str) -> Option<&Arc<CacheProfile>> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> &CacheProfileSet {
        &self.profiles
    }

    /// 可写入缓存的响应体上限（字节）
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    fn key_for(profile: &CacheProfile, route: &str, query: &[(String, String)]) -> CacheKey {
        CacheKey {
            route: route.to_string(),
            vary_values: profile.vary_values(query),
        }
    }

    /// 查找缓存条目，过期条目视为未命中并顺手移除
    pub async fn lookup(&self, route: &str, query: &[(String, String)], profile_name: &str) -> CacheLookup {
        let Some(profile) = self.profiles.get(profile_name) else {
            return CacheLookup::Miss;
        };
        if !profile.is_server_cacheable() {
            return CacheLookup::Miss;
        }

        let key = Self::key_for(profile, route, query);
        let now = Instant::now();

        let found = {
            let entries = self.entries.read().await;
            entries.get(&key).cloned()
        };

        match found {
            Some(entry) if entry.profile_name == profile_name && !entry.is_expired(now, profile.duration()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("响应缓存命中: route={}, age={:?}", route, entry.age(now));
                CacheLookup::Hit(entry)
            }
            Some(entry) => {
                let mut entries = self.entries.write().await;
                // 只移除自己看到的那个条目，避免误删刚被替换的新条目
                if entries.get(&key).is_some_and(|current| Arc::ptr_eq(current, &entry)) {
                    entries.remove(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!("响应缓存过期移除: route={}", route);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("响应缓存未命中: route={}", route);
                CacheLookup::Miss
            }
        }
    }

    /// 写入（或整体替换）缓存条目
    pub async fn store(
        &self,
        route: &str,
        query: &[(String, String)],
        profile_name: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> StoreOutcome {
        let Some(profile) = self.profiles.get(profile_name) else {
            return StoreOutcome::NotCacheable;
        };
        if !profile.is_server_cacheable() {
            return StoreOutcome::NotCacheable;
        }
        if body.len() > self.max_body_bytes {
            debug!("响应体过大，跳过缓存: route={}, size={}", route, body.len());
            return StoreOutcome::TooLarge;
        }

        let key = Self::key_for(profile, route, query);
        let entry = Arc::new(CacheEntry {
            body,
            content_type,
            stored_at: Instant::now(),
            profile_name: profile_name.to_string(),
        });

        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let purged = self.purge_locked(&mut entries, Instant::now());
            if purged == 0 {
                self.evict_oldest(&mut entries);
            }
        }
        entries.insert(key, entry);
        self.stores.fetch_add(1, Ordering::Relaxed);
        debug!("响应缓存写入: route={}, profile={}", route, profile_name);

        StoreOutcome::Stored
    }

    /// 清理所有过期条目，返回清理数量
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        self.purge_locked(&mut entries, Instant::now())
    }

    fn purge_locked(&self, entries: &mut HashMap<CacheKey, Arc<CacheEntry>>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| match self.profiles.get(&entry.profile_name) {
            Some(profile) => !entry.is_expired(now, profile.duration()),
            None => false,
        });
        let purged = before - entries.len();
        self.evictions.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    fn evict_oldest(&self, entries: &mut HashMap<CacheKey, Arc<CacheEntry>>) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.stored_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            warn!("响应缓存已满，驱逐最旧条目: route={}", key.route);
        }
    }

    /// 当前条目数量
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 缓存指标快照
    pub async fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }

    /// 启动后台清理任务
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = engine.purge_expired().await;
                if purged > 0 {
                    debug!("后台清理过期缓存: {} 条", purged);
                }
            }
        })
    }
}
