//! 内存存储实现
//!
//! 未配置数据库连接时使用，也是测试中的存储协作者。
//! 唯一性约束按 `Entity::unique_key` 检查。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::store::{CategoryStorage, EntityStore, ProductStorage, StorageError, UserStorage};
use crate::business::domain::{Category, Entity, Product, User};
use crate::shared::types::{CategoryId, EntityId, ProductId};
use crate::shared::utils::normalize_name;

/// 单表内存存储
#[derive(Debug)]
pub struct MemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<EntityId, E>>,
    next_id: AtomicI64,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn conflict(entity: &E) -> StorageError {
        StorageError::Conflict(format!("{} 唯一键重复: {}", E::KIND, entity.unique_key()))
    }

    /// 按规范化后的唯一键查找
    async fn find_by_unique_key(&self, raw: &str) -> Option<E> {
        let key = normalize_name(raw);
        let rows = self.rows.read().await;
        rows.values().find(|row| row.unique_key() == key).cloned()
    }

    fn has_duplicate(rows: &BTreeMap<EntityId, E>, entity: &E) -> bool {
        let key = entity.unique_key();
        rows.values()
            .any(|existing| existing.id() != entity.id() && existing.unique_key() == key)
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    async fn insert(&self, mut entity: E) -> Result<E, StorageError> {
        let mut rows = self.rows.write().await;
        // 新实体还没有ID，先置0再比较唯一键
        entity.set_id(0);
        if Self::has_duplicate(&rows, &entity) {
            return Err(Self::conflict(&entity));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        entity.set_id(id);
        rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, StorageError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<E>, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.rows.read().await.len() as u64)
    }

    async fn update(&self, entity: E) -> Result<Option<E>, StorageError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&entity.id()) {
            return Ok(None);
        }
        if Self::has_duplicate(&rows, &entity) {
            return Err(Self::conflict(&entity));
        }

        rows.insert(entity.id(), entity.clone());
        Ok(Some(entity))
    }

    async fn delete(&self, id: EntityId) -> Result<bool, StorageError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl CategoryStorage for MemoryStore<Category> {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, StorageError> {
        Ok(self.find_by_unique_key(name).await)
    }
}

#[async_trait]
impl ProductStorage for MemoryStore<Product> {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StorageError> {
        Ok(self.find_by_unique_key(sku).await)
    }

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn count_by_category(&self, category_id: CategoryId) -> Result<u64, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|p| p.category_id == category_id).count() as u64)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StorageError> {
        let needle = normalize_name(fragment);
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: i32) -> Result<Option<Product>, StorageError> {
        let mut rows = self.rows.write().await;
        let Some(product) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if !product.has_stock_for(quantity) {
            return Err(StorageError::Conflict(format!(
                "库存不足: 剩余 {}, 需要 {}",
                product.stock, quantity
            )));
        }

        product.stock -= quantity;
        product.updated_at = Some(Utc::now());
        Ok(Some(product.clone()))
    }
}

#[async_trait]
impl UserStorage for MemoryStore<User> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self.find_by_unique_key(username).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> Category {
        Category { id: 0, name: name.to_string(), created_at: Utc::now() }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::<Category>::new();
        let a = store.insert(category("Hogar")).await.unwrap();
        let b = store.insert(category("Jardín")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_key_conflict_on_insert_and_update() {
        let store = MemoryStore::<Category>::new();
        store.insert(category("Hogar")).await.unwrap();
        let other = store.insert(category("Jardín")).await.unwrap();

        let dup = store.insert(category(" hogar ")).await;
        assert!(matches!(dup, Err(StorageError::Conflict(_))));

        let renamed = Category { name: "HOGAR".to_string(), ..other.clone() };
        assert!(matches!(store.update(renamed).await, Err(StorageError::Conflict(_))));

        // 更新自己不算冲突
        assert!(store.update(other.clone()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryStore::<Category>::new();
        let ghost = Category { id: 99, ..category("Fantasma") };
        assert!(store.update(ghost).await.unwrap().is_none());
        assert!(!store.delete(99).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_paginates_in_id_order() {
        let store = MemoryStore::<Category>::new();
        for name in ["a", "b", "c", "d"] {
            store.insert(category(name)).await.unwrap();
        }
        let page: Vec<String> = store.list(1, 2).await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(page, vec!["b", "c"]);
    }
}
