//! 分类仓储

use chrono::Utc;
use tracing::{info, instrument};

use super::{check_pagination, RepositoryError};
use crate::business::domain::Category;
use crate::business::mapping::category::{self, CategoryDto, CreateCategoryDto, UpdateCategoryDto};
use crate::infrastructure::database::{
    CatalogLock, CategoryStorage, CategoryStore, Database, EntityStore, ProductStorage, ProductStore,
};
use crate::shared::types::{CategoryId, PaginatedResponse, PaginationParams};

const ENTITY: &str = "category";

pub struct CategoryRepository {
    store: CategoryStore,
    products: ProductStore,
    catalog_lock: CatalogLock,
}

impl CategoryRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            store: database.categories.clone(),
            products: database.products.clone(),
            catalog_lock: database.catalog_lock(),
        }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, dto: &CreateCategoryDto) -> Result<CategoryDto, RepositoryError> {
        let entity = category::to_entity(dto, Utc::now()).map_err(RepositoryError::Validation)?;
        self.ensure_name_free(&entity.name, None).await?;
        let created = self.store.insert(entity).await?;
        info!("📁 创建分类 id={} name={}", created.id, created.name);
        Ok(category::to_api_shape(&created))
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: CategoryId) -> Result<CategoryDto, RepositoryError> {
        self.find(id).await.map(|c| category::to_api_shape(&c))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, params: &PaginationParams) -> Result<PaginatedResponse<CategoryDto>, RepositoryError> {
        check_pagination(params)?;
        let total = self.store.count().await?;
        let rows = self.store.list(params.offset(), params.limit()).await?;
        let data = rows.iter().map(category::to_api_shape).collect();
        Ok(PaginatedResponse::new(data, params, total))
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: CategoryId, dto: &UpdateCategoryDto) -> Result<CategoryDto, RepositoryError> {
        let existing = self.find(id).await?;
        let mut entity = category::to_entity(dto, existing.created_at).map_err(RepositoryError::Validation)?;
        entity.id = id;
        self.ensure_name_free(&entity.name, Some(id)).await?;

        let updated = self
            .store
            .update(entity)
            .await?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, id))?;
        info!("📁 更新分类 id={}", id);
        Ok(category::to_api_shape(&updated))
    }

    /// 分类下仍有商品时拒绝删除
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let _guard = self.catalog_lock.lock().await;
        self.find(id).await?;
        let product_count = self.products.count_by_category(id).await?;
        if product_count > 0 {
            return Err(RepositoryError::Conflict(format!(
                "分类 {} 下还有 {} 个商品，无法删除",
                id, product_count
            )));
        }

        if !self.store.delete(id).await? {
            return Err(RepositoryError::not_found(ENTITY, id));
        }
        info!("🗑️ 删除分类 id={}", id);
        Ok(())
    }

    /// 名称（不区分大小写）不能与其他分类重复；存储层唯一约束仍会兜底
    async fn ensure_name_free(&self, name: &str, current: Option<CategoryId>) -> Result<(), RepositoryError> {
        match self.store.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => {
                Err(RepositoryError::Conflict(format!("分类名称 {} 已存在", existing.name)))
            }
            _ => Ok(()),
        }
    }

    async fn find(&self, id: CategoryId) -> Result<Category, RepositoryError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> CreateCategoryDto {
        CreateCategoryDto { name: Some(name.to_string()) }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let database = Database::in_memory();
        let repo = CategoryRepository::new(&database);

        let created = repo.create(&named("Electrónica")).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let repo = CategoryRepository::new(&Database::in_memory());
        assert_eq!(
            repo.get_by_id(42).await.unwrap_err(),
            RepositoryError::NotFound { entity: "category", id: 42 }
        );
        assert!(matches!(repo.update(42, &named("x")).await, Err(RepositoryError::NotFound { .. })));
        assert!(matches!(repo.delete(42).await, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_name_is_validation_error() {
        let repo = CategoryRepository::new(&Database::in_memory());
        let result = repo.create(&CreateCategoryDto { name: Some("   ".to_string()) }).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_case_insensitively() {
        let repo = CategoryRepository::new(&Database::in_memory());
        repo.create(&named("Libros")).await.unwrap();
        let result = repo.create(&named("LIBROS")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(msg)) if msg.contains("已存在")));

        let other = repo.create(&named("Revistas")).await.unwrap();
        assert!(matches!(repo.update(other.id, &named(" libros ")).await, Err(RepositoryError::Conflict(_))));
        assert!(repo.update(other.id, &named("REVISTAS")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let repo = CategoryRepository::new(&Database::in_memory());
        let created = repo.create(&named("Libros")).await.unwrap();
        let updated = repo.update(created.id, &named("Libros usados")).await.unwrap();
        assert_eq!(updated.name, "Libros usados");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let repo = CategoryRepository::new(&Database::in_memory());
        for name in ["a", "b", "c"] {
            repo.create(&named(name)).await.unwrap();
        }
        let page = repo.list(&PaginationParams { page: 2, size: 2 }).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.pagination.total_count, 3);

        let invalid = repo.list(&PaginationParams { page: 0, size: 2 }).await;
        assert!(matches!(invalid, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let repo = CategoryRepository::new(&Database::in_memory());
        let created = repo.create(&named("Temporal")).await.unwrap();
        repo.delete(created.id).await.unwrap();
        assert!(matches!(repo.get_by_id(created.id).await, Err(RepositoryError::NotFound { .. })));
    }
}
