//! 路由配置模块
//!
//! 端点和它的处理策略在同一处登记，保证路由表与注册表一致。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::Method,
    middleware,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::auth::{SigningCredential, TokenAuthenticator};
use crate::infrastructure::cache::CacheProfileEngine;
use crate::infrastructure::config::{Config, ConfigError};
use crate::infrastructure::Database;
use crate::presentation::handlers;
use crate::presentation::pipeline::{cors_middleware, route_stage, CorsPolicy, Pipeline, RoutePolicy, RouteTable};
use crate::shared::constants::cache::{DEFAULT_10, DEFAULT_20};
use crate::shared::constants::roles::ADMIN;

/// 处理器共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub pipeline: Arc<Pipeline>,
    pub bcrypt_cost: u32,
}

/// 组装路由所需的组件，由调用方显式构造
pub struct AppComponents {
    pub database: Database,
    pub authenticator: TokenAuthenticator,
    pub cache: Arc<CacheProfileEngine>,
    pub cors: CorsPolicy,
    pub bcrypt_cost: u32,
    pub request_timeout: Duration,
}

impl AppComponents {
    pub fn from_config(config: &Config, database: Database) -> Result<Self, ConfigError> {
        let credential = SigningCredential::from_config(&config.auth)?;
        let token_ttl = config.auth.token_ttl()?;

        Ok(Self {
            database,
            authenticator: TokenAuthenticator::new(credential, token_ttl),
            cache: Arc::new(CacheProfileEngine::from_config(&config.cache)?),
            cors: CorsPolicy::from_config(&config.cors)?,
            bcrypt_cost: config.auth.bcrypt_cost,
            request_timeout: Duration::from_secs(config.server.request_timeout_seconds),
        })
    }
}

/// 路由与注册表的同步构建器
struct Endpoints {
    router: Router<AppState>,
    table: RouteTable,
}

impl Endpoints {
    fn new() -> Self {
        Self { router: Router::new(), table: RouteTable::new() }
    }

    fn add(mut self, method: Method, path: &str, handler: MethodRouter<AppState>, policy: RoutePolicy) -> Self {
        self.router = self.router.route(path, handler);
        self.table.register(method, path, policy);
        self
    }
}

fn commerce_endpoints() -> Endpoints {
    let admin = || RoutePolicy::roles(&[ADMIN]);

    Endpoints::new()
        .add(Method::GET, "/health", get(handlers::health::health_check), RoutePolicy::anonymous())
        // 分类
        .add(
            Method::GET,
            "/api/categories",
            get(handlers::categories::list_categories),
            RoutePolicy::anonymous().cached(DEFAULT_10),
        )
        .add(Method::POST, "/api/categories", post(handlers::categories::create_category), admin())
        .add(
            Method::GET,
            "/api/categories/:id",
            get(handlers::categories::get_category),
            RoutePolicy::anonymous().cached(DEFAULT_10),
        )
        .add(Method::PUT, "/api/categories/:id", put(handlers::categories::update_category), admin())
        .add(Method::DELETE, "/api/categories/:id", delete(handlers::categories::delete_category), admin())
        .add(
            Method::GET,
            "/api/categories/:id/products",
            get(handlers::categories::list_category_products),
            RoutePolicy::anonymous().cached(DEFAULT_20),
        )
        // 商品
        .add(
            Method::GET,
            "/api/products",
            get(handlers::products::list_products),
            RoutePolicy::anonymous().cached(DEFAULT_20),
        )
        .add(Method::POST, "/api/products", post(handlers::products::create_product), admin())
        .add(
            Method::GET,
            "/api/products/search",
            get(handlers::products::search_products),
            RoutePolicy::anonymous().cached(DEFAULT_20),
        )
        .add(
            Method::GET,
            "/api/products/:id",
            get(handlers::products::get_product),
            RoutePolicy::anonymous().cached(DEFAULT_20),
        )
        .add(Method::PUT, "/api/products/:id", put(handlers::products::update_product), admin())
        .add(Method::DELETE, "/api/products/:id", delete(handlers::products::delete_product), admin())
        .add(
            Method::POST,
            "/api/products/:id/purchase",
            post(handlers::products::purchase_product),
            RoutePolicy::authenticated(),
        )
        // 用户
        .add(Method::POST, "/api/users", post(handlers::users::register), RoutePolicy::anonymous())
        .add(Method::GET, "/api/users", get(handlers::users::list_users), admin())
        .add(Method::POST, "/api/users/login", post(handlers::users::login), RoutePolicy::anonymous())
        .add(Method::GET, "/api/users/:id", get(handlers::users::get_user), admin())
        .add(Method::PUT, "/api/users/:id", put(handlers::users::update_user), admin())
        .add(Method::DELETE, "/api/users/:id", delete(handlers::users::delete_user), admin())
}

/// 创建应用路由
pub fn create_routes(components: AppComponents) -> Result<Router, ConfigError> {
    let Endpoints { router, table } = commerce_endpoints();
    info!("🧭 已登记 {} 个端点", table.len());

    let pipeline = Pipeline::new(components.cors, components.authenticator, components.cache, table)?;
    let state = AppState {
        database: components.database,
        pipeline: Arc::new(pipeline),
        bcrypt_cost: components.bcrypt_cost,
    };

    let app = router
        .route_layer(middleware::from_fn_with_state(state.clone(), route_stage))
        .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
        .layer(TimeoutLayer::new(components.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state);

    Ok(app)
}
