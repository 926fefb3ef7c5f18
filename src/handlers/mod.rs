//! HTTP 处理器模块

pub mod auth;
pub mod health;

use axum::http::Uri;

use crate::error::AppError;

/// 未匹配路由
pub async fn fallback(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}
