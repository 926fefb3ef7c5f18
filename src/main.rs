//! 凭据服务主入口

use credential_service::{
    config::AppConfig,
    db,
    middleware::AppState,
    repository::{InMemoryUserRepository, PgUserRepository, UserRepository},
    routes, telemetry,
};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();
    let mut in_memory = false;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--version" => {
                println!("credential-service {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            "--in-memory" => in_memory = true,
            _ => {
                eprintln!("未知参数: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 生产环境应该直接设置环境变量，不依赖 .env 文件
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Credential service starting...");

    // 3. 用户仓储：PostgreSQL 或内存
    let (users, pool): (Arc<dyn UserRepository>, Option<sqlx::PgPool>) = if in_memory {
        tracing::warn!("Using in-memory user repository; accounts are lost on restart");
        (Arc::new(InMemoryUserRepository::new()), None)
    } else {
        let pool = db::open_user_store(&config.database).await?;
        (Arc::new(PgUserRepository::new(pool.clone())), Some(pool))
    };

    // 4. 构建应用状态
    let app_state = Arc::new(AppState::build(config.clone(), users, pool)?);

    if !config.security.cookie_secure {
        tracing::warn!("Session cookie is issued without the Secure attribute");
    }

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    let shutdown_timeout = config.server.graceful_shutdown_timeout_secs;
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = shutdown_deadline(shutdown_timeout) => {
            tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }
}

/// 收到关闭信号后最多再等待 timeout_secs 秒
async fn shutdown_deadline(timeout_secs: u64) {
    shutdown_signal().await;
    tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
}

/// 打印帮助信息
fn print_help() {
    println!("credential-service {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: credential-service [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!("  --in-memory   使用内存用户仓储（不连接数据库）");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 AUTH_ 前缀的环境变量完成，例如:");
    println!("  AUTH_DATABASE__URL, AUTH_SECURITY__JWT_SECRET, AUTH_SECURITY__TOKEN_EXPIRY");
}
