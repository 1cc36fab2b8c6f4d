//! 密码处理模块

use bcrypt::{hash, verify};
use super::AuthError;

/// 哈希密码
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    hash(password, cost)
        .map_err(|e| AuthError::Password(format!("密码哈希失败: {}", e)))
}

/// 验证密码
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    verify(password, hash)
        .map_err(|e| AuthError::Password(format!("密码验证失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("secreto123", 4).unwrap();
        assert_ne!(hashed, "secreto123");
        assert!(verify_password("secreto123", &hashed).unwrap());
        assert!(!verify_password("otro-secreto", &hashed).unwrap());
    }

    #[test]
    fn test_verify_against_garbage_hash_fails() {
        assert!(verify_password("secreto123", "not-a-bcrypt-hash").is_err());
    }
}
