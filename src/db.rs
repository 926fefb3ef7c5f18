//! 用户存储的 PostgreSQL 连接
//! 打开连接池时同时完成迁移，就绪探针通过 ping 检查存储

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::{Duration, Instant};

/// 连接用户存储并执行迁移，返回可用的连接池
pub async fn open_user_store(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    // URL 中可能带密码，日志只记录主机与库名
    let options: PgConnectOptions = config
        .url
        .expose_secret()
        .parse()
        .map_err(|e: sqlx::Error| DbError::InvalidUrl(e.to_string()))?;

    let host = options.get_host().to_string();
    let database = options.get_database().unwrap_or("<default>").to_string();

    tracing::debug!(host = %host, database = %database, "Connecting to user store");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(host = %host, error = %e, "Failed to connect to user store");
            DbError::ConnectionFailed(e.to_string())
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "User store migration failed");
        DbError::MigrationFailed(e.to_string())
    })?;

    tracing::info!(
        host = %host,
        database = %database,
        max_connections = config.max_connections,
        "User store ready"
    );

    Ok(pool)
}

/// 检查存储连通性，并记录连接池指标
pub async fn ping(pool: &PgPool) -> StoreHealth {
    metrics::gauge!("user_store_pool_size").set(pool.size() as f64);
    metrics::gauge!("user_store_pool_idle").set(pool.num_idle() as f64);

    let started = Instant::now();
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => StoreHealth::Up {
            latency_ms: started.elapsed().as_millis() as u64,
        },
        Err(e) => {
            tracing::warn!(error = %e, "User store ping failed");
            StoreHealth::Down(e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// 存储连通状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Up { latency_ms: u64 },
    Down(String),
}

impl StoreHealth {
    pub fn is_up(&self) -> bool {
        matches!(self, StoreHealth::Up { .. })
    }
}
