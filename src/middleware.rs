//! HTTP 中间件
//! 应用状态与请求追踪

use axum::{extract::Request, http::HeaderMap, http::HeaderValue, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{cookie::SessionCookie, jwt::JwtService, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    repository::UserRepository,
    services::AuthService,
};

/// 应用状态
///
/// 服务均为不可变状态，通过 Arc 在请求间共享
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// 使用内存仓储时为 None
    pub db: Option<sqlx::PgPool>,
    pub auth_service: Arc<AuthService>,
    pub jwt_service: Arc<JwtService>,
    pub session_cookie: SessionCookie,
}

impl AppState {
    /// 根据配置组装所有服务
    pub fn build(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        db: Option<sqlx::PgPool>,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let hasher = Arc::new(PasswordHasher::from_config(&config)?);
        let session_cookie = SessionCookie::from_config(&config)?;

        let auth_service = Arc::new(AuthService::new(
            users,
            jwt_service.clone(),
            hasher,
            Arc::new(config.clone()),
        )?);

        Ok(Self {
            config,
            db,
            auth_service,
            jwt_service,
            session_cookie,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        metrics::counter!(
            "http_requests_total",
            "method" => method.clone(),
            "status" => status.to_string()
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中回显追踪 ID
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
