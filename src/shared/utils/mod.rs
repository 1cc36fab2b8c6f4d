//! 工具函数模块

/// 规范化名称用于唯一性比较（去除首尾空白并转为小写）
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 把价格（元）转换为分，拒绝负数和非有限值
pub fn price_to_cents(price: f64) -> Option<i64> {
    if !price.is_finite() || price < 0.0 {
        return None;
    }
    Some((price * 100.0).round() as i64)
}

/// 把分转换回价格（元）
pub fn cents_to_price(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// 时间戳工具
pub mod time {
    use chrono::{DateTime, Utc};

    /// 格式化时间为ISO 8601字符串
    pub fn format_iso8601(datetime: DateTime<Utc>) -> String {
        datetime.to_rfc3339()
    }
}

/// 验证工具
pub mod validation {
    /// 验证用户名（字母数字加下划线，3-20位）
    pub fn is_valid_username(username: &str) -> bool {
        if username.len() < 3 || username.len() > 20 {
            return false;
        }
        
        username.chars().all(|c| c.is_alphanumeric() || c == '_')
    }
    
    /// 验证密码强度（至少8位，包含字母和数字）
    pub fn is_strong_password(password: &str) -> bool {
        if password.len() < 8 {
            return false;
        }
        
        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_number = password.chars().any(|c| c.is_numeric());
        
        has_letter && has_number
    }

    /// 提取必填字符串字段：缺失或全为空白时返回 None
    pub fn required(value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Electrónica "), "electrónica");
        assert_eq!(normalize_name("ROPA"), normalize_name("ropa"));
    }
    
    #[test]
    fn test_price_conversion() {
        assert_eq!(price_to_cents(19.99), Some(1999));
        assert_eq!(price_to_cents(0.0), Some(0));
        assert_eq!(price_to_cents(-1.0), None);
        assert_eq!(price_to_cents(f64::NAN), None);
        assert_eq!(cents_to_price(1999), 19.99);
    }
    
    #[test]
    fn test_validation() {
        use validation::*;
        
        assert!(is_valid_username("test_user"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("invalid-user"));
        
        assert!(is_strong_password("password123"));
        assert!(!is_strong_password("password"));
        assert!(!is_strong_password("123456"));

        assert_eq!(required(Some("  libros ")), Some("libros".to_string()));
        assert_eq!(required(Some("   ")), None);
        assert_eq!(required(None), None);
    }
}
