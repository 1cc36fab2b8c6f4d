//! 用户映射
//!
//! 对外的形状永远不包含密码哈希。

use serde::{Deserialize, Serialize};

use crate::business::domain::{Role, User};
use crate::shared::utils::validation::{is_valid_username, required};

/// 用户信息（API响应）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
}

/// 注册请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserDto {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// 更新用户请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

/// 登录请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLoginDto {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// 登录响应
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponseDto {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: String,
    pub user: UserDto,
}

pub fn to_api_shape(user: &User) -> UserDto {
    UserDto {
        id: user.id,
        username: user.username.clone(),
        name: user.name.clone(),
        role: user.role,
    }
}

/// 转换为未持久化的实体，注册用户固定为普通角色
pub fn to_entity(dto: &CreateUserDto, password_hash: String) -> Result<User, String> {
    let username = required(dto.username.as_deref()).ok_or("用户名不能为空")?;
    if !is_valid_username(&username) {
        return Err("用户名只能包含字母、数字和下划线，长度3-20位".to_string());
    }
    let name = required(dto.name.as_deref()).ok_or("姓名不能为空")?;

    Ok(User {
        id: 0,
        username,
        name,
        password_hash,
        role: Role::User,
    })
}
