//! 商品处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::auth::Claims;
use crate::business::mapping::{CreateProductDto, ProductDto, PurchaseDto, UpdateProductDto};
use crate::infrastructure::repositories::ProductRepository;
use crate::presentation::extract::{ApiJson, ApiPath, ApiQuery};
use crate::presentation::routes::AppState;
use crate::shared::types::{PaginatedResponse, PaginationParams, ProductId};
use crate::shared::AppResult;

/// 搜索参数
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> AppResult<Json<PaginatedResponse<ProductDto>>> {
    Ok(Json(ProductRepository::new(&state.database).list(&params).await?))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<ProductDto>>> {
    let found = ProductRepository::new(&state.database)
        .search(query.name.as_deref())
        .await?;
    Ok(Json(found))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> AppResult<Json<ProductDto>> {
    Ok(Json(ProductRepository::new(&state.database).get_by_id(id).await?))
}

#[instrument(skip(state, dto))]
pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(dto): ApiJson<CreateProductDto>,
) -> AppResult<(StatusCode, Json<ProductDto>)> {
    let created = ProductRepository::new(&state.database).create(&dto).await?;
    info!("✅ 商品创建成功: {} ({})", created.id, created.sku);
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, dto))]
pub async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(dto): ApiJson<UpdateProductDto>,
) -> AppResult<Json<ProductDto>> {
    Ok(Json(ProductRepository::new(&state.database).update(id, &dto).await?))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> AppResult<StatusCode> {
    ProductRepository::new(&state.database).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 购买商品（任意已认证用户）
#[instrument(skip(state, claims, dto), fields(user = %claims.sub))]
pub async fn purchase_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(dto): ApiJson<PurchaseDto>,
) -> AppResult<Json<ProductDto>> {
    let product = ProductRepository::new(&state.database).purchase(id, &dto).await?;
    info!("🛒 用户 {} 购买商品 {}", claims.sub, id);
    Ok(Json(product))
}
