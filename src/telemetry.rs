//! 结构化日志初始化

use crate::config::AppConfig;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// 安装全局 subscriber；重复安装返回错误而不是 panic
pub fn init_telemetry(config: &AppConfig) -> anyhow::Result<()> {
    // RUST_LOG 优先；sqlx 的逐条语句日志默认压到 warn
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("{},sqlx=warn", config.logging.level))?,
    };

    let fmt_layer = if config.logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().pretty().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        format = %config.logging.format,
        "Telemetry initialized"
    );

    Ok(())
}
