//! 跨域策略
//!
//! 来源必须显式列出；配置 `*` 时只在不允许凭据的情况下生效。
//! 预检请求在这里直接应答，不会进入认证和仓储。

use std::collections::{BTreeSet, HashSet};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::infrastructure::config::{ConfigError, CorsConfig};
use crate::presentation::routes::AppState;
use crate::shared::constants::cors::WILDCARD;
use crate::shared::AppError;

/// 来源规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    Any,
    List(BTreeSet<String>),
}

/// 跨域判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    Allowed,
    Rejected(String),
}

impl CorsDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CorsDecision::Allowed)
    }
}

/// 启动时构建的跨域规则，之后只读
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: OriginRule,
    methods: HashSet<Method>,
    headers: BTreeSet<String>,
    allow_credentials: bool,
    max_age_seconds: u64,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        let origins = if config.allowed_origins.iter().any(|o| o == WILDCARD) {
            warn!("⚠️ CORS 配置了通配来源 '*'，凭据支持将被关闭");
            OriginRule::Any
        } else {
            OriginRule::List(
                config
                    .allowed_origins
                    .iter()
                    .map(|o| o.trim_end_matches('/').to_string())
                    .collect(),
            )
        };

        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_uppercase().as_bytes())
                    .map_err(|_| ConfigError::Invalid(format!("无效的HTTP方法: {}", m)))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let headers = config.allowed_headers.iter().map(|h| h.to_lowercase()).collect();

        let allow_credentials = config.allow_credentials && origins != OriginRule::Any;
        if config.allow_credentials && !allow_credentials {
            warn!("⚠️ 通配来源不能与 allow_credentials 同时使用，已忽略 allow_credentials");
        }

        Ok(Self {
            origins,
            methods,
            headers,
            allow_credentials,
            max_age_seconds: config.max_age_seconds,
        })
    }

    pub fn allows_credentials(&self) -> bool {
        self.allow_credentials
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        match &self.origins {
            OriginRule::Any => true,
            OriginRule::List(list) => list.contains(origin),
        }
    }

    /// 来源、方法、所有请求头（不区分大小写）都在允许列表中才放行
    pub fn evaluate(&self, origin: &str, method: &Method, requested_headers: &[String]) -> CorsDecision {
        if !self.origin_allowed(origin) {
            return CorsDecision::Rejected(format!("来源 {} 不在允许列表中", origin));
        }
        if !self.methods.contains(method) {
            return CorsDecision::Rejected(format!("方法 {} 不被允许", method));
        }
        if let Some(header) = requested_headers
            .iter()
            .find(|h| !self.headers.contains(&h.to_lowercase()))
        {
            return CorsDecision::Rejected(format!("请求头 {} 不被允许", header));
        }
        CorsDecision::Allowed
    }

    /// `Access-Control-Allow-Origin` 的取值
    fn allow_origin_value(&self, origin: &str) -> Option<HeaderValue> {
        match self.origins {
            OriginRule::Any => Some(HeaderValue::from_static(WILDCARD)),
            OriginRule::List(_) => HeaderValue::from_str(origin).ok(),
        }
    }

    fn apply_actual_headers(&self, headers: &mut HeaderMap, origin: &str) {
        if let Some(value) = self.allow_origin_value(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if self.allow_credentials {
            headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        headers.append(header::VARY, HeaderValue::from_static("origin"));
    }

    /// 预检应答（204）
    pub fn preflight_response(&self, origin: &str) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        self.apply_actual_headers(headers, origin);

        let mut methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        methods.sort_unstable();
        let methods = methods.join(", ");
        if let Ok(value) = HeaderValue::from_str(&methods) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        let allowed_headers = self.headers.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        if let Ok(value) = HeaderValue::from_str(&allowed_headers) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age_seconds));
        response
    }
}

/// 解析 `Access-Control-Request-Headers`
fn requested_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

fn rejected(reason: String) -> Response {
    let mut response = AppError::CorsRejected(reason).into_response();
    response.headers_mut().append(header::VARY, HeaderValue::from_static("origin"));
    response
}

/// 跨域中间件（最外层）
pub async fn cors_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let policy = &state.pipeline.cors;

    // 没有 Origin 的请求不是跨域请求
    let Some(origin) = request.headers().get(header::ORIGIN) else {
        return next.run(request).await;
    };
    let Ok(origin) = origin.to_str().map(str::to_string) else {
        return rejected("Origin 头不是有效字符串".to_string());
    };

    let preflight_method = request
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    if request.method() == Method::OPTIONS {
        if let Some(raw_method) = preflight_method {
            let Ok(method) = Method::from_bytes(raw_method.as_bytes()) else {
                return rejected(format!("无效的预检方法: {}", raw_method));
            };
            return match policy.evaluate(&origin, &method, &requested_headers(request.headers())) {
                CorsDecision::Allowed => {
                    debug!("✈️ 预检通过: {} {}", origin, method);
                    policy.preflight_response(&origin)
                }
                CorsDecision::Rejected(reason) => rejected(reason),
            };
        }
    }

    if let CorsDecision::Rejected(reason) = policy.evaluate(&origin, request.method(), &[]) {
        return rejected(reason);
    }

    let mut response = next.run(request).await;
    policy.apply_actual_headers(response.headers_mut(), &origin);
    response
}
