//! 统一错误模型
//! 认证流程的所有失败都汇总到 AppError，并在 HTTP 边界转成统一的错误体

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::jwt::TokenError;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 注册时邮箱已存在
    #[error("Email already exists")]
    DuplicateCredential,

    /// 邮箱不存在或密码错误，两者对外不可区分
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// 令牌缺失、格式错误、签名错误或已过期，对外统一为未认证
    #[error("Authentication failed")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 与既有客户端约定：凭据类错误返回 400 而非 401/409
            AppError::DuplicateCredential
            | AppError::InvalidCredentials
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 稳定的机器可读错误码，客户端按它分支而不是解析消息
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DuplicateCredential => "duplicate_credential",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthorized => "unauthenticated",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_failed",
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => "internal",
        }
    }

    /// 对外消息，服务端错误不带任何内部细节
    pub fn user_message(&self) -> String {
        match self {
            AppError::DuplicateCredential => "Email already exists".to_string(),
            AppError::InvalidCredentials => "Invalid Credentials".to_string(),
            AppError::Unauthorized => "Unauthenticated".to_string(),
            AppError::NotFound(what) => format!("Resource not found: {}", what),
            AppError::Validation(msg) => msg.clone(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(what.to_string())
    }
}

/// 错误响应体: `{"error": {"status": 400, "code": "...", "message": "..."}}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(e: &AppError) -> Self {
        Self {
            error: ErrorDetail {
                status: e.status_code().as_u16(),
                code: e.kind(),
                message: e.user_message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 完整错误只进日志；请求 ID 由请求追踪 span 携带
        if status.is_server_error() {
            tracing::error!(code = self.kind(), error = %self, "Request failed");
        } else {
            tracing::warn!(code = self.kind(), error = %self, "Request rejected");
        }

        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

/// 令牌校验失败的具体原因只进入 debug 日志
impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        tracing::debug!(reason = %e, "Token verification failed");
        AppError::Unauthorized
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
