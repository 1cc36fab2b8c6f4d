//! 请求提取器
//!
//! 包装 axum 的 `Json` / `Path` / `Query`，解析失败时返回统一的错误信封。

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::shared::AppError;

/// JSON 请求体
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// 路径参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// 查询参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    use crate::shared::types::PaginationParams;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        price: f64,
    }

    async fn by_id(ApiPath(id): ApiPath<i64>) -> String {
        id.to_string()
    }

    async fn paged(ApiQuery(params): ApiQuery<PaginationParams>) -> String {
        params.page.to_string()
    }

    async fn create(ApiJson(payload): ApiJson<Payload>) -> impl IntoResponse {
        let _ = payload;
        StatusCode::CREATED
    }

    fn router() -> Router {
        Router::new()
            .route("/items/:id", get(by_id))
            .route("/items", get(paged).post(create))
    }

    async fn error_code(request: Request<Body>) -> (StatusCode, String) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["error"]["code"].as_str().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn test_bad_path_uses_error_envelope() {
        let request = Request::builder().uri("/items/abc").body(Body::empty()).unwrap();
        assert_eq!(error_code(request).await, (StatusCode::BAD_REQUEST, "INVALID_REQUEST".to_string()));
    }

    #[tokio::test]
    async fn test_bad_query_uses_error_envelope() {
        let request = Request::builder().uri("/items?page=abc").body(Body::empty()).unwrap();
        assert_eq!(error_code(request).await, (StatusCode::BAD_REQUEST, "INVALID_REQUEST".to_string()));
    }

    #[tokio::test]
    async fn test_bad_json_keeps_rejection_status() {
        let wrong_type = Request::builder()
            .method("POST")
            .uri("/items")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"price":"x"}"#))
            .unwrap();
        assert_eq!(
            error_code(wrong_type).await,
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST".to_string())
        );

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/items")
            .body(Body::from(r#"{"price":1.0}"#))
            .unwrap();
        assert_eq!(
            error_code(no_content_type).await,
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "INVALID_REQUEST".to_string())
        );
    }

    #[tokio::test]
    async fn test_valid_input_passes_through() {
        let request = Request::builder().uri("/items/7").body(Body::empty()).unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
