//! 统一错误处理模块
//!
//! 定义系统中所有错误类型，提供统一的错误处理机制

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::infrastructure::repositories::RepositoryError;
use crate::shared::constants::http::RETRY_AFTER_SECONDS;

/// 应用程序统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 认证相关错误
    #[error("认证错误: {0}")]
    Authentication(#[from] AuthError),

    /// 授权被拒绝（已认证但角色不满足）
    #[error("权限不足: {0}")]
    AuthorizationDenied(String),

    /// 跨域请求被拒绝
    #[error("跨域请求被拒绝: {0}")]
    CorsRejected(String),

    /// 仓储层错误
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// 路径、查询参数或请求体无法解析
    #[error("请求无效: {message}")]
    InvalidRequest { status: StatusCode, message: String },

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取HTTP状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(AuthError::TokenIssuance(_) | AuthError::Password(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            AppError::CorsRejected(_) => StatusCode::FORBIDDEN,
            AppError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
                RepositoryError::Validation(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                RepositoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::InvalidRequest { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Authentication(e) => e.error_code(),
            AppError::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            AppError::CorsRejected(_) => "CORS_REJECTED",
            AppError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => "NOT_FOUND",
                RepositoryError::Validation(_) => "VALIDATION_ERROR",
                RepositoryError::Conflict(_) => "CONFLICT",
                RepositoryError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
                RepositoryError::Storage(_) => "STORAGE_ERROR",
            },
            AppError::InvalidRequest { .. } => "INVALID_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_code = self.error_code();

        // 客户端错误不视为服务端故障
        if status_code.is_server_error() {
            tracing::error!(
                status = ?status_code,
                error_code = error_code,
                error = %self,
                "处理请求时发生错误"
            );
        } else {
            tracing::warn!(
                status = ?status_code,
                error_code = error_code,
                error = %self,
                "请求被拒绝"
            );
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        let mut response = (status_code, body).into_response();
        match status_code {
            StatusCode::UNAUTHORIZED => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(RETRY_AFTER_SECONDS),
                );
            }
            _ => {}
        }
        response
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 内部错误构造宏
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::Internal(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Authentication(AuthError::Expired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::AuthorizationDenied("admin".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(RepositoryError::NotFound { entity: "category", id: 7 }).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(RepositoryError::Conflict("dup".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(RepositoryError::StorageUnavailable("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_unauthorized_response_carries_challenge() {
        let response = AppError::Authentication(AuthError::MissingToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_unavailable_response_carries_retry_after() {
        let response = AppError::from(RepositoryError::StorageUnavailable("pool".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }
}
