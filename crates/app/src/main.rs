mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use slotbot_api::server::{AppState, start_server};
use slotbot_dispatch::broadcaster::Broadcaster;
use slotbot_dispatch::dispatcher::Dispatcher;
use slotbot_dispatch::ingest::CommandLoop;
use slotbot_dispatch::limiter::TokenBucketLimiter;
use slotbot_dispatch::router::CommandRouter;
use slotbot_notify::telegram::TelegramChannel;
use slotbot_notify::updates::TelegramUpdates;
use slotbot_store::subscriber::SqliteSubscriberStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到分发层。
///
/// # Logic
/// 1. 加载配置并初始化全局日志。
/// 2. 实例化基础设施层（Store、Telegram 适配器、限流器）。
/// 3. 构造分发层（Dispatcher、Broadcaster、CommandRouter）。
/// 4. 启动指令拉取循环与 HTTP 触发服务。
/// 5. 收到退出信号后取消并等待在途任务结束。
#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. 配置与日志
    let config = settings::load(Path::new("config.toml"))?;
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();
    info!("slotbot starting...");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    if config.telegram.bot_token.is_empty() {
        return Err(
            "telegram.bot_token is not configured (set SLOTBOT__TELEGRAM__BOT_TOKEN)".into(),
        );
    }

    // 2. 基础设施层
    slotbot_store::config::set_root_dir(PathBuf::from(&config.database.data_dir));
    let store = Arc::new(SqliteSubscriberStore::new().await?);
    let channel = Arc::new(TelegramChannel::new(
        &config.telegram.api_base,
        config.telegram.bot_token.clone(),
    ));
    let updates = Arc::new(TelegramUpdates::new(
        &config.telegram.api_base,
        config.telegram.bot_token.clone(),
        config.telegram.poll_timeout_secs,
    )?);
    let limiter = Arc::new(TokenBucketLimiter::from_config(&config.limiter));

    // 3. 分发层
    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(channel, store.clone(), limiter, shutdown.clone());
    let broadcaster = Broadcaster::new(store.clone(), dispatcher.clone());
    let router = CommandRouter::new(store.clone(), dispatcher);

    // 4. 后台任务
    let command_loop = CommandLoop::new(
        updates,
        router,
        Duration::from_secs(config.telegram.retry_delay_secs),
    );
    let loop_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { command_loop.run(shutdown).await }
    });

    let state = AppState {
        broadcaster,
        store,
    };
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let server_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = start_server(state, &bind_addr, shutdown.clone()).await {
                error!("API server failed: {}", e);
                shutdown.cancel();
            }
        }
    });

    info!("slotbot ready. Waiting for signals...");

    // 5. 等待退出信号 (或服务异常退出)
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => info!("Shutting down after a fatal component error"),
    }
    shutdown.cancel();

    loop_handle.await?;
    server_handle.await?;
    info!("slotbot stopped");

    Ok(())
}
