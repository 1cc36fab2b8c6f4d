//! 分类处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{info, instrument};

use crate::business::mapping::{CategoryDto, CreateCategoryDto, ProductDto, UpdateCategoryDto};
use crate::infrastructure::repositories::{CategoryRepository, ProductRepository};
use crate::presentation::extract::{ApiJson, ApiPath, ApiQuery};
use crate::presentation::routes::AppState;
use crate::shared::types::{CategoryId, PaginatedResponse, PaginationParams};
use crate::shared::AppResult;

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> AppResult<Json<PaginatedResponse<CategoryDto>>> {
    let page = CategoryRepository::new(&state.database).list(&params).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> AppResult<Json<CategoryDto>> {
    Ok(Json(CategoryRepository::new(&state.database).get_by_id(id).await?))
}

#[instrument(skip(state))]
pub async fn list_category_products(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> AppResult<Json<Vec<ProductDto>>> {
    Ok(Json(ProductRepository::new(&state.database).list_by_category(id).await?))
}

#[instrument(skip(state, dto))]
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(dto): ApiJson<CreateCategoryDto>,
) -> AppResult<(StatusCode, Json<CategoryDto>)> {
    let created = CategoryRepository::new(&state.database).create(&dto).await?;
    info!("✅ 分类创建成功: {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, dto))]
pub async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(dto): ApiJson<UpdateCategoryDto>,
) -> AppResult<Json<CategoryDto>> {
    Ok(Json(CategoryRepository::new(&state.database).update(id, &dto).await?))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> AppResult<StatusCode> {
    CategoryRepository::new(&state.database).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
