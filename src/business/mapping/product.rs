//! 商品映射

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::business::domain::Product;
use crate::shared::utils::{cents_to_price, price_to_cents, validation::required};

/// 商品信息（API响应）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub sku: String,
    pub stock: i32,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 创建商品请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub category_id: Option<i64>,
}

/// 更新商品请求（整体替换，必填字段同创建）
pub type UpdateProductDto = CreateProductDto;

/// 购买请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseDto {
    pub quantity: Option<i32>,
}

pub fn to_api_shape(product: &Product) -> ProductDto {
    ProductDto {
        id: product.id,
        name: product.name.clone(),
        description: product.description.clone(),
        price: cents_to_price(product.price_cents),
        image_url: product.image_url.clone(),
        sku: product.sku.clone(),
        stock: product.stock,
        category_id: product.category_id,
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

/// 转换为未持久化的实体（ID由存储层分配）
pub fn to_entity(dto: &CreateProductDto, now: DateTime<Utc>) -> Result<Product, String> {
    let name = required(dto.name.as_deref()).ok_or("商品名称不能为空")?;
    let sku = required(dto.sku.as_deref()).ok_or("商品SKU不能为空")?;
    let price = dto.price.ok_or("商品价格不能为空")?;
    let price_cents = price_to_cents(price).ok_or("商品价格必须是非负数")?;
    let category_id = dto.category_id.ok_or("商品分类不能为空")?;
    let stock = dto.stock.unwrap_or(0);
    if stock < 0 {
        return Err("库存不能为负数".to_string());
    }

    Ok(Product {
        id: 0,
        name,
        description: dto.description.as_deref().map(str::trim).unwrap_or_default().to_string(),
        price_cents,
        image_url: required(dto.image_url.as_deref()),
        sku,
        stock,
        category_id,
        created_at: now,
        updated_at: None,
    })
}
