//! 领域模型模块
//!
//! 定义商城的核心实体：分类、商品、用户

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::constants::roles;
use crate::shared::types::{CategoryId, EntityId, ProductId, UserId};
use crate::shared::utils::normalize_name;

/// 存储层实体的公共约束
pub trait Entity: Clone + Send + Sync + 'static {
    /// 实体名称（用于日志和错误信息）
    const KIND: &'static str;

    fn id(&self) -> EntityId;

    /// 由存储层分配ID后写回
    fn set_id(&mut self, id: EntityId);

    /// 唯一性约束键（已规范化）
    fn unique_key(&self) -> String;
}

/// 分类领域模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    const KIND: &'static str = "category";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn unique_key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// 商品领域模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub sku: String,
    pub stock: i32,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// 检查库存是否足够
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

impl Entity for Product {
    const KIND: &'static str = "product";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn unique_key(&self) -> String {
        normalize_name(&self.sku)
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => roles::ADMIN,
            Role::User => roles::USER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            roles::ADMIN => Ok(Role::Admin),
            roles::USER => Ok(Role::User),
            other => Err(format!("未知角色: {}", other)),
        }
    }
}

/// 用户领域模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    /// Token 中携带的角色列表
    pub fn role_claims(&self) -> Vec<String> {
        vec![self.role.as_str().to_string()]
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn unique_key(&self) -> String {
        normalize_name(&self.username)
    }
}
