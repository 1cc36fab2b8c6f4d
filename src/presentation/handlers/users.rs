//! 用户处理器
//!
//! 注册和登录是匿名端点，其余都要求管理员角色。

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{info, instrument};

use crate::business::mapping::{CreateUserDto, LoginResponseDto, UpdateUserDto, UserDto, UserLoginDto};
use crate::infrastructure::repositories::UserRepository;
use crate::presentation::extract::{ApiJson, ApiPath, ApiQuery};
use crate::presentation::routes::AppState;
use crate::shared::types::{PaginatedResponse, PaginationParams, UserId};
use crate::shared::utils::time::format_iso8601;
use crate::shared::AppResult;

fn repository(state: &AppState) -> UserRepository {
    UserRepository::new(&state.database, state.bcrypt_cost)
}

/// 注册
#[instrument(skip(state, dto))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(dto): ApiJson<CreateUserDto>,
) -> AppResult<(StatusCode, Json<UserDto>)> {
    let created = repository(&state).create(&dto).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// 登录并签发Token
#[instrument(skip(state, dto))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(dto): ApiJson<UserLoginDto>,
) -> AppResult<Json<LoginResponseDto>> {
    let user = repository(&state).authenticate(&dto).await?;
    let roles = vec![user.role.as_str().to_string()];
    let issued = state
        .pipeline
        .authenticator
        .issue(user.id, &user.username, &roles)?;

    info!("🔑 签发Token: 用户 {} 过期时间 {}", user.id, issued.expires_at);
    Ok(Json(LoginResponseDto {
        token: issued.token,
        token_type: "Bearer",
        expires_at: format_iso8601(issued.expires_at),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> AppResult<Json<PaginatedResponse<UserDto>>> {
    Ok(Json(repository(&state).list(&params).await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> AppResult<Json<UserDto>> {
    Ok(Json(repository(&state).get_by_id(id).await?))
}

#[instrument(skip(state, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(dto): ApiJson<UpdateUserDto>,
) -> AppResult<Json<UserDto>> {
    Ok(Json(repository(&state).update(id, &dto).await?))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> AppResult<StatusCode> {
    repository(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
