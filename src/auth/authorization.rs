//! 基于角色的授权判定

use std::collections::BTreeSet;

use super::jwt::Claims;

/// 端点要求的角色集合，空集合表示任何已认证调用方都可访问
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of(roles: &[&str]) -> Self {
        Self(roles.iter().map(|r| r.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// 授权结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// 授权闸门
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// 角色集合为空或 Claims 至少包含其中一个角色时放行
    pub fn authorize(&self, claims: &Claims, required_roles: &RoleSet) -> Decision {
        if required_roles.is_empty() {
            return Decision::Allow;
        }

        if claims.roles.iter().any(|role| required_roles.contains(role)) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with(roles: &[&str]) -> Claims {
        Claims {
            sub: "1".to_string(),
            name: "ana".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: i64::MAX,
            iat: 0,
        }
    }

    #[test]
    fn test_public_endpoint_allows_any_claims() {
        let gate = AuthorizationGate;
        assert_eq!(gate.authorize(&claims_with(&[]), &RoleSet::any()), Decision::Allow);
        assert_eq!(gate.authorize(&claims_with(&["user"]), &RoleSet::any()), Decision::Allow);
    }

    #[test]
    fn test_restricted_endpoint_requires_matching_role() {
        let gate = AuthorizationGate;
        let admin_only = RoleSet::of(&["admin"]);

        assert_eq!(gate.authorize(&claims_with(&["admin"]), &admin_only), Decision::Allow);
        assert_eq!(gate.authorize(&claims_with(&["user"]), &admin_only), Decision::Deny);
        assert_eq!(gate.authorize(&claims_with(&[]), &admin_only), Decision::Deny);
    }

    #[test]
    fn test_any_of_several_roles_suffices() {
        let gate = AuthorizationGate;
        let staff = RoleSet::of(&["admin", "editor"]);

        assert_eq!(gate.authorize(&claims_with(&["user", "editor"]), &staff), Decision::Allow);
    }
}
