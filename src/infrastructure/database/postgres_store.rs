//! PostgreSQL 存储实现
//!
//! 针对已存在的 `categories` / `products` / `users` 表执行简单的CRUD语句，
//! 不负责建表与迁移。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, warn};

use super::store::{CategoryStorage, EntityStore, ProductStorage, StorageError, UserStorage};
use crate::business::domain::{Category, Product, Role, User};
use crate::shared::types::{CategoryId, EntityId, ProductId};

const CATEGORY_COLUMNS: &str = "id, name, created_at";
const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, image_url, sku, stock, category_id, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, name, password_hash, role";

/// sqlx 错误统一记录后转换
fn storage_error(e: sqlx::Error) -> StorageError {
    let converted = StorageError::from(e);
    log_storage_error(&converted);
    converted
}

/// 约束冲突最终是 409，按客户端错误记 warn
fn log_storage_error(error: &StorageError) {
    match error {
        StorageError::Conflict(msg) => warn!("数据库约束冲突: {}", msg),
        other => error!("数据库操作错误: {}", other),
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category { id: row.id, name: row.name, created_at: row.created_at }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price_cents: i64,
    image_url: Option<String>,
    sku: String,
    stock: i32,
    category_id: i64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            price_cents: row.price_cents,
            image_url: row.image_url,
            sku: row.sku,
            stock: row.stock,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    name: String,
    password_hash: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(StorageError::Backend)?;
        Ok(User {
            id: row.id,
            username: row.username,
            name: row.name,
            password_hash: row.password_hash,
            role,
        })
    }
}

/// 基于连接池的存储，三张表共用一个池
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 扣减失败时区分"商品不存在"和"库存不足"
    async fn explain_failed_decrement(&self, id: ProductId, quantity: i32) -> Result<Option<Product>, StorageError> {
        match EntityStore::<Product>::find_by_id(self, id).await? {
            None => Ok(None),
            Some(product) => Err(StorageError::Conflict(format!(
                "库存不足: 剩余 {}, 需要 {}",
                product.stock, quantity
            ))),
        }
    }
}

#[async_trait]
impl EntityStore<Category> for PgStore {
    async fn insert(&self, entity: Category) -> Result<Category, StorageError> {
        let sql = format!(
            "INSERT INTO categories (name, created_at) VALUES ($1, $2) RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row: CategoryRow = sqlx::query_as(&sql)
            .bind(&entity.name)
            .bind(entity.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        debug!("插入分类 id={}", row.id);
        Ok(row.into())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Category>, StorageError> {
        let sql = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Category>, StorageError> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY id LIMIT $1 OFFSET $2",
            CATEGORY_COLUMNS
        );
        let rows: Vec<CategoryRow> = sqlx::query_as(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, entity: Category) -> Result<Option<Category>, StorageError> {
        let sql = format!(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(entity.id)
            .bind(&entity.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: EntityId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryStorage for PgStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, StorageError> {
        let sql = format!("SELECT {} FROM categories WHERE LOWER(name) = LOWER($1)", CATEGORY_COLUMNS);
        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl EntityStore<Product> for PgStore {
    async fn insert(&self, entity: Product) -> Result<Product, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO products (name, description, price_cents, image_url, sku, stock, category_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );
        let row: ProductRow = sqlx::query_as(&sql)
            .bind(&entity.name)
            .bind(&entity.description)
            .bind(entity.price_cents)
            .bind(&entity.image_url)
            .bind(&entity.sku)
            .bind(entity.stock)
            .bind(entity.category_id)
            .bind(entity.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        debug!("插入商品 id={}", row.id);
        Ok(row.into())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Product>, StorageError> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Product>, StorageError> {
        let sql = format!(
            "SELECT {} FROM products ORDER BY id LIMIT $1 OFFSET $2",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, entity: Product) -> Result<Option<Product>, StorageError> {
        let sql = format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4, image_url = $5,
                sku = $6, stock = $7, category_id = $8, updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(entity.id)
            .bind(&entity.name)
            .bind(&entity.description)
            .bind(entity.price_cents)
            .bind(&entity.image_url)
            .bind(&entity.sku)
            .bind(entity.stock)
            .bind(entity.category_id)
            .bind(entity.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: EntityId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductStorage for PgStore {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StorageError> {
        let sql = format!("SELECT {} FROM products WHERE LOWER(sku) = LOWER($1)", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StorageError> {
        let sql = format!(
            "SELECT {} FROM products WHERE category_id = $1 ORDER BY id",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_category(&self, category_id: CategoryId) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StorageError> {
        let pattern = format!(
            "%{}%",
            fragment.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        let sql = format!(
            "SELECT {} FROM products WHERE name ILIKE $1 ORDER BY id",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: i32) -> Result<Option<Product>, StorageError> {
        let sql = format!(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(quantity)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        match row {
            Some(row) => Ok(Some(row.into())),
            None => self.explain_failed_decrement(id, quantity).await,
        }
    }
}

#[async_trait]
impl EntityStore<User> for PgStore {
    async fn insert(&self, entity: User) -> Result<User, StorageError> {
        let sql = format!(
            "INSERT INTO users (username, name, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(&entity.username)
            .bind(&entity.name)
            .bind(&entity.password_hash)
            .bind(entity.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        debug!("插入用户 id={}", row.id);
        row.try_into()
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<User>, StorageError> {
        let sql = format!("SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2", USER_COLUMNS);
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, entity: User) -> Result<Option<User>, StorageError> {
        let sql = format!(
            "UPDATE users SET name = $2, password_hash = $3, role = $4 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(entity.id)
            .bind(&entity.name)
            .bind(&entity.password_hash)
            .bind(entity.role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn delete(&self, id: EntityId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStorage for PgStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(username) = LOWER($1)", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }
}
