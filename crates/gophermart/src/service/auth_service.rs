//! 用户注册与登录

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::{JwtManager, hash_password, verify_password};
use crate::error::{LoyaltyError, Result};
use crate::repository::UserRepositoryTrait;

/// 认证服务
pub struct AuthService {
    users: Arc<dyn UserRepositoryTrait>,
    jwt: JwtManager,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepositoryTrait>, jwt: JwtManager, bcrypt_cost: u32) -> Self {
        Self {
            users,
            jwt,
            bcrypt_cost,
        }
    }

    /// 注册并直接签发 Token
    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> Result<String> {
        validate_credentials(login, password)?;

        let hash = hash_password(password, self.bcrypt_cost)?;
        let user = self.users.create_user(login, &hash).await?;
        info!(user_id = user.id, "用户注册成功");

        self.jwt.generate_token(user.id, &user.login)
    }

    /// 校验密码并签发 Token
    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<String> {
        validate_credentials(login, password)?;

        let Some(user) = self.users.get_user_by_login(login).await? else {
            warn!("登录失败：用户不存在");
            return Err(LoyaltyError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "登录失败：密码错误");
            return Err(LoyaltyError::InvalidCredentials);
        }

        self.jwt.generate_token(user.id, &user.login)
    }
}

fn validate_credentials(login: &str, password: &str) -> Result<()> {
    if login.trim().is_empty() || password.is_empty() {
        return Err(LoyaltyError::Validation("用户名和密码不能为空".to_string()));
    }
    Ok(())
}
