//! 商品仓储

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{check_pagination, RepositoryError};
use crate::business::domain::Product;
use crate::business::mapping::product::{
    self, CreateProductDto, ProductDto, PurchaseDto, UpdateProductDto,
};
use crate::infrastructure::database::{
    CatalogLock, CategoryStore, Database, EntityStore, ProductStorage, ProductStore,
};
use crate::shared::types::{CategoryId, PaginatedResponse, PaginationParams, ProductId};

const ENTITY: &str = "product";

pub struct ProductRepository {
    store: ProductStore,
    categories: CategoryStore,
    catalog_lock: CatalogLock,
}

impl ProductRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            store: database.products.clone(),
            categories: database.categories.clone(),
            catalog_lock: database.catalog_lock(),
        }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, dto: &CreateProductDto) -> Result<ProductDto, RepositoryError> {
        let entity = product::to_entity(dto, Utc::now()).map_err(RepositoryError::Validation)?;
        self.ensure_sku_free(&entity.sku, None).await?;

        let _guard = self.catalog_lock.lock().await;
        self.ensure_category(entity.category_id).await?;
        let created = self.store.insert(entity).await?;
        info!("📦 创建商品 id={} sku={}", created.id, created.sku);
        Ok(product::to_api_shape(&created))
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<ProductDto, RepositoryError> {
        self.find(id).await.map(|p| product::to_api_shape(&p))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, params: &PaginationParams) -> Result<PaginatedResponse<ProductDto>, RepositoryError> {
        check_pagination(params)?;
        let total = self.store.count().await?;
        let rows = self.store.list(params.offset(), params.limit()).await?;
        let data = rows.iter().map(product::to_api_shape).collect();
        Ok(PaginatedResponse::new(data, params, total))
    }

    /// 整体替换，保留创建时间
    #[instrument(skip(self))]
    pub async fn update(&self, id: ProductId, dto: &UpdateProductDto) -> Result<ProductDto, RepositoryError> {
        let existing = self.find(id).await?;
        let mut entity = product::to_entity(dto, existing.created_at).map_err(RepositoryError::Validation)?;
        entity.id = id;
        entity.updated_at = Some(Utc::now());
        self.ensure_sku_free(&entity.sku, Some(id)).await?;

        let _guard = self.catalog_lock.lock().await;
        self.ensure_category(entity.category_id).await?;
        let updated = self
            .store
            .update(entity)
            .await?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, id))?;
        info!("📦 更新商品 id={}", id);
        Ok(product::to_api_shape(&updated))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        if !self.store.delete(id).await? {
            return Err(RepositoryError::not_found(ENTITY, id));
        }
        info!("🗑️ 删除商品 id={}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<ProductDto>, RepositoryError> {
        if self.categories.find_by_id(category_id).await?.is_none() {
            return Err(RepositoryError::not_found("category", category_id));
        }
        let rows = self.store.list_by_category(category_id).await?;
        debug!("分类 {} 下有 {} 个商品", category_id, rows.len());
        Ok(rows.iter().map(product::to_api_shape).collect())
    }

    /// 按名称片段搜索（不区分大小写）
    #[instrument(skip(self))]
    pub async fn search(&self, name: Option<&str>) -> Result<Vec<ProductDto>, RepositoryError> {
        let fragment = name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RepositoryError::Validation("搜索关键字不能为空".to_string()))?;

        let rows = self.store.search_by_name(fragment).await?;
        debug!("搜索 '{}' 命中 {} 个商品", fragment, rows.len());
        Ok(rows.iter().map(product::to_api_shape).collect())
    }

    /// 购买：原子扣减库存
    #[instrument(skip(self))]
    pub async fn purchase(&self, id: ProductId, dto: &PurchaseDto) -> Result<ProductDto, RepositoryError> {
        let quantity = match dto.quantity {
            Some(q) if q > 0 => q,
            _ => return Err(RepositoryError::Validation("购买数量必须大于0".to_string())),
        };

        match self.store.decrement_stock(id, quantity).await {
            Ok(Some(updated)) => {
                info!("🛒 商品 {} 售出 {} 件，剩余库存 {}", id, quantity, updated.stock);
                Ok(product::to_api_shape(&updated))
            }
            Ok(None) => Err(RepositoryError::not_found(ENTITY, id)),
            Err(e) => {
                warn!("商品 {} 扣减库存失败: {}", id, e);
                Err(e.into())
            }
        }
    }

    async fn find(&self, id: ProductId) -> Result<Product, RepositoryError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, id))
    }

    /// SKU（不区分大小写）不能与其他商品重复；存储层唯一约束仍会兜底
    async fn ensure_sku_free(&self, sku: &str, current: Option<ProductId>) -> Result<(), RepositoryError> {
        match self.store.find_by_sku(sku).await? {
            Some(existing) if Some(existing.id) != current => {
                Err(RepositoryError::Conflict(format!("SKU {} 已存在", existing.sku)))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_category(&self, category_id: CategoryId) -> Result<(), RepositoryError> {
        match self.categories.find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(RepositoryError::Validation(format!("分类 {} 不存在", category_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::business::domain::{Category, User};
    use crate::business::mapping::category::CreateCategoryDto;
    use crate::infrastructure::database::{CategoryStorage, MemoryStore, StorageError};
    use crate::infrastructure::repositories::CategoryRepository;
    use crate::shared::types::EntityId;

    async fn seeded() -> (Database, CategoryId) {
        let database = Database::in_memory();
        let category = CategoryRepository::new(&database)
            .create(&CreateCategoryDto { name: Some("Muebles".to_string()) })
            .await
            .unwrap();
        (database, category.id)
    }

    fn dto(sku: &str, name: &str, category_id: CategoryId, stock: i32) -> CreateProductDto {
        CreateProductDto {
            name: Some(name.to_string()),
            description: None,
            price: Some(120.0),
            image_url: None,
            sku: Some(sku.to_string()),
            stock: Some(stock),
            category_id: Some(category_id),
        }
    }

    #[tokio::test]
    async fn test_create_requires_existing_category() {
        let (database, _) = seeded().await;
        let repo = ProductRepository::new(&database);
        let result = repo.create(&dto("MES-1", "Mesa", 999, 1)).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_sku_conflicts() {
        let (database, category_id) = seeded().await;
        let repo = ProductRepository::new(&database);
        repo.create(&dto("MES-1", "Mesa", category_id, 1)).await.unwrap();
        let result = repo.create(&dto("mes-1", "Otra mesa", category_id, 1)).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_by_category_and_search() {
        let (database, category_id) = seeded().await;
        let repo = ProductRepository::new(&database);
        repo.create(&dto("MES-1", "Mesa comedor", category_id, 1)).await.unwrap();
        repo.create(&dto("SIL-1", "Silla", category_id, 1)).await.unwrap();

        assert_eq!(repo.list_by_category(category_id).await.unwrap().len(), 2);
        assert!(matches!(
            repo.list_by_category(999).await,
            Err(RepositoryError::NotFound { entity: "category", id: 999 })
        ));

        let found = repo.search(Some("MESA")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sku, "MES-1");
        assert!(matches!(repo.search(Some("  ")).await, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_purchase_decrements_stock() {
        let (database, category_id) = seeded().await;
        let repo = ProductRepository::new(&database);
        let created = repo.create(&dto("MES-1", "Mesa", category_id, 3)).await.unwrap();

        let after = repo.purchase(created.id, &PurchaseDto { quantity: Some(2) }).await.unwrap();
        assert_eq!(after.stock, 1);

        let insufficient = repo.purchase(created.id, &PurchaseDto { quantity: Some(2) }).await;
        assert!(matches!(insufficient, Err(RepositoryError::Conflict(_))));

        let zero = repo.purchase(created.id, &PurchaseDto { quantity: Some(0) }).await;
        assert!(matches!(zero, Err(RepositoryError::Validation(_))));

        let missing = repo.purchase(404, &PurchaseDto { quantity: Some(1) }).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_category_with_products_cannot_be_deleted() {
        let (database, category_id) = seeded().await;
        ProductRepository::new(&database)
            .create(&dto("MES-1", "Mesa", category_id, 1))
            .await
            .unwrap();
        let result = CategoryRepository::new(&database).delete(category_id).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_sets_updated_at() {
        let (database, category_id) = seeded().await;
        let repo = ProductRepository::new(&database);
        let created = repo.create(&dto("MES-1", "Mesa", category_id, 1)).await.unwrap();
        assert!(created.updated_at.is_none());

        let updated = repo.update(created.id, &dto("MES-1", "Mesa grande", category_id, 4)).await.unwrap();
        assert_eq!(updated.name, "Mesa grande");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_detected_before_storage() {
        let (database, category_id) = seeded().await;
        let repo = ProductRepository::new(&database);
        let first = repo.create(&dto("MES-1", "Mesa", category_id, 1)).await.unwrap();
        let second = repo.create(&dto("SIL-1", "Silla", category_id, 1)).await.unwrap();

        let duplicate = repo.create(&dto("  mes-1 ", "Otra", category_id, 1)).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(msg)) if msg.contains("已存在")));

        // 改成别人的 SKU 冲突，保留自己的 SKU 没问题
        let stolen = repo.update(second.id, &dto("MES-1", "Silla", category_id, 1)).await;
        assert!(matches!(stolen, Err(RepositoryError::Conflict(_))));
        assert!(repo.update(first.id, &dto("mes-1", "Mesa", category_id, 2)).await.is_ok());
    }

    /// 查询分类时多让出几次调度，放大并发窗口
    #[derive(Default)]
    struct SlowCategories {
        inner: MemoryStore<Category>,
    }

    #[async_trait]
    impl EntityStore<Category> for SlowCategories {
        async fn insert(&self, entity: Category) -> Result<Category, StorageError> {
            self.inner.insert(entity).await
        }

        async fn find_by_id(&self, id: EntityId) -> Result<Option<Category>, StorageError> {
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            self.inner.find_by_id(id).await
        }

        async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Category>, StorageError> {
            self.inner.list(offset, limit).await
        }

        async fn count(&self) -> Result<u64, StorageError> {
            self.inner.count().await
        }

        async fn update(&self, entity: Category) -> Result<Option<Category>, StorageError> {
            self.inner.update(entity).await
        }

        async fn delete(&self, id: EntityId) -> Result<bool, StorageError> {
            self.inner.delete(id).await
        }
    }

    #[async_trait]
    impl CategoryStorage for SlowCategories {
        async fn find_by_name(&self, name: &str) -> Result<Option<Category>, StorageError> {
            self.inner.find_by_name(name).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_create_and_category_delete_leave_no_orphans() {
        let categories = Arc::new(SlowCategories::default());
        let category = categories
            .inner
            .insert(Category { id: 0, name: "Muebles".to_string(), created_at: Utc::now() })
            .await
            .unwrap();
        let database = Database::from_stores(
            categories.clone(),
            Arc::new(MemoryStore::<Product>::new()),
            Arc::new(MemoryStore::<User>::new()),
        );

        let products = ProductRepository::new(&database);
        let category_repo = CategoryRepository::new(&database);
        let new_product = dto("MES-1", "Mesa", category.id, 1);
        let (created, deleted) = tokio::join!(
            products.create(&new_product),
            category_repo.delete(category.id),
        );

        assert_ne!(created.is_ok(), deleted.is_ok());
        let category_exists = categories.inner.find_by_id(category.id).await.unwrap().is_some();
        let in_category = database.products.count_by_category(category.id).await.unwrap();
        assert!(category_exists || in_category == 0, "商品引用了已删除的分类");
    }
}
