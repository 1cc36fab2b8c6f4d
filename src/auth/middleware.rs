//! 请求认证与授权
//!
//! 路由阶段按端点的访问要求调用这里：匿名端点直接放行，
//! 其余端点先校验 Bearer Token，再交给授权闸门判断角色。

use axum::http::{header, HeaderMap};
use tracing::{debug, warn};

use super::{AuthError, AuthorizationGate, Claims, Decision, RoleSet, TokenAuthenticator};
use crate::shared::AppError;

/// 端点访问要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// 不需要 Token
    Anonymous,
    /// 需要有效 Token；角色集合为空表示任何已认证用户
    Authenticated(RoleSet),
}

impl Access {
    pub fn any_user() -> Self {
        Access::Authenticated(RoleSet::any())
    }

    pub fn roles(roles: &[&str]) -> Self {
        Access::Authenticated(RoleSet::of(roles))
    }
}

impl Default for Access {
    fn default() -> Self {
        Access::any_user()
    }
}

/// 认证当前请求
///
/// 匿名端点返回 `Ok(None)`，不读取 Authorization 头。
pub fn authenticate_request(
    authenticator: &TokenAuthenticator,
    gate: &AuthorizationGate,
    headers: &HeaderMap,
    access: &Access,
) -> Result<Option<Claims>, AppError> {
    let required_roles = match access {
        Access::Anonymous => return Ok(None),
        Access::Authenticated(roles) => roles,
    };

    let raw_header = match headers.get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedToken)?),
        None => None,
    };

    let claims = authenticator.validate(raw_header).map_err(|e| {
        debug!("Token校验失败: {}", e);
        AppError::Authentication(e)
    })?;

    match gate.authorize(&claims, required_roles) {
        Decision::Allow => Ok(Some(claims)),
        Decision::Deny => {
            let required: Vec<&str> = required_roles.iter().collect();
            warn!("🚫 用户 {} 角色 {:?} 不满足要求 {:?}", claims.sub, claims.roles, required);
            Err(AppError::AuthorizationDenied(format!("需要以下角色之一: {}", required.join(", "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SigningCredential;
    use axum::http::HeaderValue;
    use jsonwebtoken::Algorithm;

    fn authenticator() -> TokenAuthenticator {
        let credential = SigningCredential::new(b"0123456789abcdef0123456789abcdef", Algorithm::HS256).unwrap();
        TokenAuthenticator::new(credential, chrono::Duration::hours(1))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    #[test]
    fn test_anonymous_ignores_headers() {
        let headers = bearer("garbage");
        let result = authenticate_request(&authenticator(), &AuthorizationGate, &headers, &Access::Anonymous);
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let result = authenticate_request(&authenticator(), &AuthorizationGate, &HeaderMap::new(), &Access::any_user());
        assert!(matches!(result, Err(AppError::Authentication(AuthError::MissingToken))));
    }

    #[test]
    fn test_role_mismatch_is_denied() {
        let auth = authenticator();
        let token = auth.issue(7, "ana", &["user".to_string()]).unwrap().token;
        let result = authenticate_request(&auth, &AuthorizationGate, &bearer(&token), &Access::roles(&["admin"]));
        assert!(matches!(result, Err(AppError::AuthorizationDenied(_))));
    }

    #[test]
    fn test_matching_role_returns_claims() {
        let auth = authenticator();
        let token = auth.issue(7, "ana", &["admin".to_string()]).unwrap().token;
        let claims = authenticate_request(&auth, &AuthorizationGate, &bearer(&token), &Access::roles(&["admin"]))
            .unwrap()
            .unwrap();
        assert_eq!(claims.sub, "7");
    }
}
