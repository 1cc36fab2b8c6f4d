//! JWT Token处理模块
//!
//! 负责签发和校验 Bearer Token。校验是纯函数：只依赖 Token、签名凭据和当前时间。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;
use crate::infrastructure::config::{AuthConfig, ConfigError};
use crate::shared::constants::jwt::JWT_SECRET_MIN_LENGTH;
use crate::shared::types::UserId;

/// 签名凭据：密钥字节 + 算法，启动后只读
#[derive(Clone)]
pub struct SigningCredential {
    secret: Arc<[u8]>,
    algorithm: Algorithm,
}

impl SigningCredential {
    /// 创建签名凭据，密钥为空时直接失败
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }
        if secret.len() < JWT_SECRET_MIN_LENGTH {
            warn!(
                "⚠️ JWT密钥长度只有 {} 字节，建议至少 {} 字节",
                secret.len(),
                JWT_SECRET_MIN_LENGTH
            );
        }

        Ok(Self {
            secret: Arc::from(secret),
            algorithm,
        })
    }

    /// 从认证配置加载
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let algorithm = Algorithm::from_str(config.jwt_algorithm.trim())
            .map_err(|_| ConfigError::UnsupportedAlgorithm(config.jwt_algorithm.clone()))?;
        Self::new(config.jwt_secret.as_bytes(), algorithm)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// JWT Claims结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // 用户ID
    pub name: String,         // 用户名
    #[serde(default)]
    pub roles: Vec<String>,   // 角色
    pub exp: i64,             // 过期时间
    pub iat: i64,             // 签发时间
}

impl Claims {
    /// 解析主体为用户ID
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::MalformedToken)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// 签发结果
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Bearer Token 认证器
pub struct TokenAuthenticator {
    credential: SigningCredential,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl TokenAuthenticator {
    /// 创建新的认证器
    pub fn new(credential: SigningCredential, token_ttl: Duration) -> Self {
        let mut validation = Validation::new(credential.algorithm);
        // 过期时间由 validate_at 按传入的当前时间自行判断
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(&credential.secret),
            decoding_key: DecodingKey::from_secret(&credential.secret),
            credential,
            validation,
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// 生成JWT Token
    pub fn issue(&self, user_id: UserId, name: &str, roles: &[String]) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, name, roles, Utc::now())
    }

    /// 以指定时间为签发时间生成Token
    pub fn issue_at(
        &self,
        user_id: UserId,
        name: &str,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::TokenIssuance("过期时间超出可表示范围".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            roles: roles.to_vec(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(self.credential.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// 验证 Authorization 头中的 Bearer Token
    pub fn validate(&self, raw_header: Option<&str>) -> Result<Claims, AuthError> {
        self.validate_at(raw_header, Utc::now())
    }

    /// 以指定时间为基准验证Token
    pub fn validate_at(&self, raw_header: Option<&str>, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(raw_header)?;

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token解码失败: {}", e);
                match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::MalformedToken,
                }
            })?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

/// 从 Authorization 头的值中提取 Bearer token
pub fn extract_bearer_token(raw_header: Option<&str>) -> Result<&str, AuthError> {
    let value = raw_header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedToken);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"a-sufficiently-long-test-secret-for-hs256";

    fn authenticator(secret: &[u8], algorithm: Algorithm) -> TokenAuthenticator {
        let credential = SigningCredential::new(secret, algorithm).unwrap();
        TokenAuthenticator::new(credential, Duration::hours(1))
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_issue_and_validate() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        let issued = auth.issue(42, "ana", &["admin".to_string()]).unwrap();

        let claims = auth.validate(Some(&bearer(&issued.token))).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.name, "ana");
        assert!(claims.has_role("admin"));
        assert!(!claims.has_role("user"));
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_missing_token() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        assert_eq!(auth.validate(None), Err(AuthError::MissingToken));
        assert_eq!(auth.validate(Some("   ")), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_malformed_token() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        assert_eq!(auth.validate(Some("Basic dXNlcjpwYXNz")), Err(AuthError::MalformedToken));
        assert_eq!(auth.validate(Some("Bearer")), Err(AuthError::MalformedToken));
        assert_eq!(auth.validate(Some("Bearer not.a.jwt")), Err(AuthError::MalformedToken));
        assert_eq!(auth.validate(Some("Bearer garbage")), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        let issued = auth.issue(1, "ana", &[]).unwrap();
        assert!(auth.validate(Some(&format!("bearer {}", issued.token))).is_ok());
    }

    #[test]
    fn test_invalid_signature_with_other_secret() {
        let issuer = authenticator(b"another-secret-that-is-long-enough-too", Algorithm::HS256);
        let auth = authenticator(SECRET, Algorithm::HS256);
        let issued = issuer.issue(1, "ana", &[]).unwrap();

        assert_eq!(auth.validate(Some(&bearer(&issued.token))), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_algorithm_mismatch_is_invalid_signature() {
        let issuer = authenticator(SECRET, Algorithm::HS512);
        let auth = authenticator(SECRET, Algorithm::HS256);
        let issued = issuer.issue(1, "ana", &[]).unwrap();

        assert_eq!(auth.validate(Some(&bearer(&issued.token))), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        let issued = auth.issue(7, "ana", &["user".to_string()]).unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let mut claims: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        claims["roles"] = serde_json::json!(["admin"]);
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(auth.validate(Some(&bearer(&forged))), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_expired_token() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        let issued_at = Utc::now() - Duration::hours(2);
        let issued = auth.issue_at(1, "ana", &[], issued_at).unwrap();

        assert_eq!(auth.validate(Some(&bearer(&issued.token))), Err(AuthError::Expired));
    }

    #[test]
    fn test_expiry_boundary_has_no_leeway() {
        let auth = authenticator(SECRET, Algorithm::HS256);
        let now = Utc::now();
        let issued = auth.issue_at(1, "ana", &[], now).unwrap();
        let header = bearer(&issued.token);

        let just_before = issued.expires_at - Duration::seconds(1);
        assert!(auth.validate_at(Some(&header), just_before).is_ok());
        assert_eq!(auth.validate_at(Some(&header), issued.expires_at), Err(AuthError::Expired));
    }

    #[test]
    fn test_unrepresentable_expiry_fails_issuance() {
        let credential = SigningCredential::new(SECRET, Algorithm::HS256).unwrap();
        let auth = TokenAuthenticator::new(credential, Duration::weeks(52 * 300_000));
        assert!(matches!(
            auth.issue(1, "ana", &[]),
            Err(AuthError::TokenIssuance(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(matches!(
            SigningCredential::new(b"", Algorithm::HS256),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_asymmetric_algorithm_is_rejected() {
        assert!(matches!(
            SigningCredential::new(SECRET, Algorithm::RS256),
            Err(ConfigError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_credential_debug_redacts_secret() {
        let credential = SigningCredential::new(SECRET, Algorithm::HS256).unwrap();
        let printed = format!("{:?}", credential);
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("sufficiently"));
    }
}
