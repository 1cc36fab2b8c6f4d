//! 请求处理管道
//!
//! 固定顺序：跨域 → Token认证 → 角色授权 → 缓存查找 → 处理器 → 缓存写入。
//! 任一环节拒绝都会直接返回，后面的环节不会执行。

pub mod cors;
pub mod route_table;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{MatchedPath, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::auth::{authenticate_request, AuthorizationGate, TokenAuthenticator};
use crate::infrastructure::cache::{CacheEntry, CacheLookup, CacheProfile, CacheProfileEngine, StoreOutcome};
use crate::infrastructure::config::ConfigError;
use crate::presentation::routes::AppState;
use crate::shared::constants::cache::X_CACHE_HEADER;
use crate::shared::AppError;

pub use cors::{cors_middleware, CorsDecision, CorsPolicy};
pub use route_table::{RoutePolicy, RouteTable};

/// 管道的只读组件，启动时组装一次
pub struct Pipeline {
    pub cors: CorsPolicy,
    pub authenticator: TokenAuthenticator,
    pub gate: AuthorizationGate,
    pub cache: Arc<CacheProfileEngine>,
    pub routes: RouteTable,
}

impl Pipeline {
    /// 组装管道；路由引用了未注册的缓存配置时启动失败
    pub fn new(
        cors: CorsPolicy,
        authenticator: TokenAuthenticator,
        cache: Arc<CacheProfileEngine>,
        routes: RouteTable,
    ) -> Result<Self, ConfigError> {
        routes.validate_profiles(cache.profiles())?;
        Ok(Self {
            cors,
            authenticator,
            gate: AuthorizationGate,
            cache,
            routes,
        })
    }
}

fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default()
}

/// 请求带 `Cache-Control: no-cache` 时跳过查找
fn wants_fresh(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("no-cache"))
}

fn set_cache_headers(headers: &mut HeaderMap, profile: &CacheProfile, hit: bool) {
    if let Ok(value) = HeaderValue::from_str(&profile.cache_control()) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(
        X_CACHE_HEADER,
        HeaderValue::from_static(if hit { "HIT" } else { "MISS" }),
    );
}

fn cached_response(entry: &CacheEntry, profile: &CacheProfile) -> Response {
    let mut response = Response::new(Body::from(entry.body.clone()));
    let headers = response.headers_mut();
    if let Some(content_type) = entry.content_type.as_deref().and_then(|ct| HeaderValue::from_str(ct).ok()) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert(header::AGE, HeaderValue::from(entry.age(Instant::now()).as_secs()));
    set_cache_headers(headers, profile, true);
    response
}

/// 响应体大小上界已知且不超过 `limit`
fn fits_cache(body: &Body, limit: usize) -> bool {
    body.size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64)
}

/// 路由阶段中间件（挂在 route_layer 上，能拿到匹配的路由模板）
pub async fn route_stage(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let pipeline = &state.pipeline;
    let policy = pipeline.routes.resolve(
        request.method(),
        request.extensions().get::<MatchedPath>().map(MatchedPath::as_str),
    );

    if let Some(claims) = authenticate_request(
        &pipeline.authenticator,
        &pipeline.gate,
        request.headers(),
        &policy.access,
    )? {
        request.extensions_mut().insert(claims);
    }

    let profile = match &policy.cache_profile {
        Some(name) if request.method() == Method::GET => pipeline.cache.profile(name).cloned(),
        _ => None,
    };
    let Some(profile) = profile else {
        return Ok(next.run(request).await);
    };

    let route = request.uri().path().to_string();
    let query = query_pairs(request.uri());

    if wants_fresh(request.headers()) {
        debug!("请求要求跳过缓存: {}", route);
    } else if let CacheLookup::Hit(entry) = pipeline.cache.lookup(&route, &query, profile.name()).await {
        debug!("🎯 缓存命中: {} ({})", route, profile.name());
        return Ok(cached_response(&entry, &profile));
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        let mut response = response;
        response.headers_mut().insert(X_CACHE_HEADER, HeaderValue::from_static("MISS"));
        return Ok(response);
    }

    // 只缓冲确定不超过上限的响应体，其余原样流式返回
    let limit = pipeline.cache.max_body_bytes();
    if !fits_cache(response.body(), limit) {
        debug!("响应体可能超过缓存上限，跳过缓存: {}", route);
        let mut response = response;
        set_cache_headers(response.headers_mut(), &profile, false);
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, limit)
        .await
        .map_err(|e| crate::internal_error!("读取响应体失败: {}", e))?;
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match pipeline
        .cache
        .store(&route, &query, profile.name(), bytes.clone(), content_type)
        .await
    {
        StoreOutcome::Stored => debug!("💾 写入缓存: {} ({})", route, profile.name()),
        StoreOutcome::TooLarge => warn!("响应体过大，未写入缓存: {} ({} 字节)", route, bytes.len()),
        StoreOutcome::NotCacheable => {}
    }

    set_cache_headers(&mut parts.headers, &profile, false);
    Ok(Response::from_parts(parts, Body::from(bytes)))
}
