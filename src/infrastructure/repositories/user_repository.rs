//! 用户仓储
//!
//! 注册、登录校验和管理员维护用户。密码哈希只在本模块与存储之间流转。

use tracing::{info, instrument, warn};

use super::{check_pagination, RepositoryError};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthError;
use crate::business::domain::{Role, User};
use crate::business::mapping::user::{self, CreateUserDto, UpdateUserDto, UserDto, UserLoginDto};
use crate::infrastructure::database::{Database, EntityStore, UserStorage, UserStore};
use crate::shared::types::{PaginatedResponse, PaginationParams, UserId};
use crate::shared::utils::validation::{is_strong_password, required};
use crate::shared::AppResult;

const ENTITY: &str = "user";

pub struct UserRepository {
    store: UserStore,
    bcrypt_cost: u32,
}

impl UserRepository {
    pub fn new(database: &Database, bcrypt_cost: u32) -> Self {
        Self {
            store: database.users.clone(),
            bcrypt_cost,
        }
    }

    /// 注册新用户，角色固定为 `user`
    #[instrument(skip(self, dto), fields(username = ?dto.username))]
    pub async fn create(&self, dto: &CreateUserDto) -> AppResult<UserDto> {
        let password = Self::checked_password(dto.password.as_deref())?;
        // 先校验字段再做哈希
        user::to_entity(dto, String::new()).map_err(RepositoryError::Validation)?;

        let password_hash = hash_password(&password, self.bcrypt_cost)?;
        let entity = user::to_entity(dto, password_hash).map_err(RepositoryError::Validation)?;

        if self.store.find_by_username(&entity.username).await.map_err(RepositoryError::from)?.is_some() {
            return Err(RepositoryError::Conflict(format!("用户名 {} 已存在", entity.username)).into());
        }

        let created = self.store.insert(entity).await.map_err(RepositoryError::from)?;
        info!("👤 注册用户 id={} username={}", created.id, created.username);
        Ok(user::to_api_shape(&created))
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: UserId) -> AppResult<UserDto> {
        Ok(user::to_api_shape(&self.find(id).await?))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, params: &PaginationParams) -> AppResult<PaginatedResponse<UserDto>> {
        check_pagination(params)?;
        let total = self.store.count().await.map_err(RepositoryError::from)?;
        let rows = self
            .store
            .list(params.offset(), params.limit())
            .await
            .map_err(RepositoryError::from)?;
        let data = rows.iter().map(user::to_api_shape).collect();
        Ok(PaginatedResponse::new(data, params, total))
    }

    /// 更新姓名和角色，密码可选
    #[instrument(skip(self, dto))]
    pub async fn update(&self, id: UserId, dto: &UpdateUserDto) -> AppResult<UserDto> {
        let name = required(dto.name.as_deref())
            .ok_or_else(|| RepositoryError::Validation("姓名不能为空".to_string()))?;
        let role: Role = required(dto.role.as_deref())
            .ok_or_else(|| RepositoryError::Validation("角色不能为空".to_string()))?
            .parse()
            .map_err(RepositoryError::Validation)?;

        let existing = self.find(id).await?;
        let password_hash = match dto.password.as_deref() {
            Some(raw) => {
                let password = Self::checked_password(Some(raw))?;
                hash_password(&password, self.bcrypt_cost)?
            }
            None => existing.password_hash.clone(),
        };

        let updated = self
            .store
            .update(User { name, role, password_hash, ..existing })
            .await
            .map_err(RepositoryError::from)?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, id))?;
        info!("👤 更新用户 id={} role={}", id, updated.role);
        Ok(user::to_api_shape(&updated))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> AppResult<()> {
        if !self.store.delete(id).await.map_err(RepositoryError::from)? {
            return Err(RepositoryError::not_found(ENTITY, id).into());
        }
        info!("🗑️ 删除用户 id={}", id);
        Ok(())
    }

    /// 校验用户名和密码，不透露是哪一项错误
    #[instrument(skip(self, dto), fields(username = ?dto.username))]
    pub async fn authenticate(&self, dto: &UserLoginDto) -> AppResult<UserDto> {
        let (Some(username), Some(password)) = (required(dto.username.as_deref()), dto.password.as_deref()) else {
            return Err(AuthError::InvalidCredentials.into());
        };

        let Some(found) = self.store.find_by_username(&username).await.map_err(RepositoryError::from)? else {
            warn!("🔐 登录失败: 用户不存在");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password, &found.password_hash)? {
            warn!("🔐 登录失败: 密码错误 user_id={}", found.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        info!("🔐 用户登录成功 id={}", found.id);
        Ok(user::to_api_shape(&found))
    }

    async fn find(&self, id: UserId) -> Result<User, RepositoryError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, id))
    }

    fn checked_password(raw: Option<&str>) -> Result<String, RepositoryError> {
        let password = raw
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RepositoryError::Validation("密码不能为空".to_string()))?;
        if !is_strong_password(password) {
            return Err(RepositoryError::Validation(
                "密码至少8位，且需同时包含字母和数字".to_string(),
            ));
        }
        Ok(password.to_string())
    }
}
