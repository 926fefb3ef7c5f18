//! 认证服务：注册、登录、令牌解析

use crate::{
    auth::{
        jwt::{IssuedToken, JwtService, PrincipalId},
        password::PasswordHasher,
    },
    config::AppConfig,
    error::AppError,
    models::{auth::*, user::*},
    repository::UserRepository,
};
use std::sync::Arc;
use validator::Validate;

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt_service: Arc<JwtService>,
    hasher: Arc<PasswordHasher>,
    config: Arc<AppConfig>,
    /// 未知邮箱登录时用于陪跑校验，使两种失败耗时一致
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        jwt_service: Arc<JwtService>,
        hasher: Arc<PasswordHasher>,
        config: Arc<AppConfig>,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash("credential-service-dummy-password")?;

        Ok(Self {
            users,
            jwt_service,
            hasher,
            config,
            dummy_hash,
        })
    }

    /// 用户注册
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AppError> {
        req.validate()?;
        PasswordHasher::validate_password_policy(&req.password, &self.config)?;

        let email = normalize_email(&req.email);

        // 快速拒绝；并发注册由 insert 的唯一约束兜底
        if self.users.exists_by_email(&email).await? {
            return Err(AppError::DuplicateCredential);
        }

        let password_hash = self.hash_blocking(req.password).await?;

        let user = self
            .users
            .insert(NewUser {
                name: req.name.trim().to_string(),
                email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        metrics::counter!("auth_register_total").increment(1);

        Ok(UserResponse::from(user))
    }

    /// 用户登录，成功时签发令牌
    pub async fn login(&self, req: LoginRequest) -> Result<IssuedToken, AppError> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let user = self.users.find_by_email(&email).await?;

        // 邮箱不存在与密码错误走同一条校验路径
        let (stored_hash, user_id) = match &user {
            Some(user) => (user.password_hash.clone(), Some(user.id)),
            None => (self.dummy_hash.clone(), None),
        };
        let password_ok = self.verify_blocking(req.password, stored_hash).await?;

        let user_id = match (user_id, password_ok) {
            (Some(id), true) => id,
            _ => {
                tracing::warn!("Login rejected: invalid credentials");
                metrics::counter!("auth_login_total", "outcome" => "rejected").increment(1);
                return Err(AppError::InvalidCredentials);
            }
        };

        let issued = self.jwt_service.issue(user_id)?;

        tracing::info!(user_id, expires_at = %issued.expires_at, "Login succeeded");
        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);

        Ok(issued)
    }

    /// 解析令牌并加载对应用户
    pub async fn authenticate(&self, token: &str) -> Result<UserResponse, AppError> {
        let user_id = self.jwt_service.verify(token)?;
        self.current_user(user_id).await
    }

    /// 加载已认证主体的用户信息
    pub async fn current_user(&self, user_id: PrincipalId) -> Result<UserResponse, AppError> {
        let user = self.users.find_by_id(user_id).await?.ok_or_else(|| {
            tracing::debug!(user_id, "Token subject has no user record");
            AppError::Unauthorized
        })?;

        Ok(UserResponse::from(user))
    }

    /// Argon2 是 CPU 密集型操作，放到阻塞线程池执行
    async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }
}

/// 邮箱统一去空白并转小写
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
