//! 认证和授权模块
//! 
//! 提供JWT认证、基于角色的授权和密码处理功能

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;

// 重新导出常用类型
pub use authorization::{AuthorizationGate, Decision, RoleSet};
pub use jwt::{Claims, IssuedToken, SigningCredential, TokenAuthenticator};
pub use middleware::{authenticate_request, Access};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("缺少认证Token")]
    MissingToken,
    #[error("Token格式错误")]
    MalformedToken,
    #[error("Token签名无效")]
    InvalidSignature,
    #[error("Token已过期")]
    Expired,
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("Token签发失败: {0}")]
    TokenIssuance(String),
    #[error("密码处理失败: {0}")]
    Password(String),
}

impl AuthError {
    /// 对外暴露的错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::InvalidSignature => "INVALID_SIGNATURE",
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::TokenIssuance(_) | AuthError::Password(_) => "AUTH_ERROR",
        }
    }
}
