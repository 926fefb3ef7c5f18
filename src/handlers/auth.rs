//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::auth::*,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.register(req).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// 登录：令牌通过 HttpOnly Cookie 下发
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state.auth_service.login(req).await?;
    let cookie = state.session_cookie.issue(&issued)?;

    Ok(([(header::SET_COOKIE, cookie)], Json(MessageResponse::success())))
}

/// 获取当前用户信息
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.current_user(auth_context.user_id).await?;

    Ok(Json(user))
}

/// 登出：只清除客户端 Cookie，已签发的令牌在过期前仍然有效
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let cookie = state.session_cookie.clear()?;

    Ok(([(header::SET_COOKIE, cookie)], Json(MessageResponse::success())))
}
