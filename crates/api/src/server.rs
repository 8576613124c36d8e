//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use slotbot_core::store::port::SubscriberStore;
use slotbot_dispatch::broadcaster::Broadcaster;

use crate::routes::{health, notify, subscriber};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 与指令处理共享同一个 `Broadcaster` 及其背后的限流器，HTTP 触发的广播同样受全局限流约束。
#[derive(Clone)]
pub struct AppState {
    /// 广播器
    pub broadcaster: Arc<Broadcaster>,
    /// 订阅者存储 (只读查询)
    pub store: Arc<dyn SubscriberStore>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "slotbot API",
        version = "0.1.0",
        description = "疫苗放号提醒机器人的触发接口：提交放号结果以广播给订阅者，并查询订阅情况。",
        license(name = "MIT")
    ),
    tags(
        (name = "广播 (Notify)", description = "放号结果广播"),
        (name = "订阅者 (Subscriber)", description = "订阅者统计"),
        (name = "系统 (System)", description = "健康检查")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// # Summary
/// 构建完整的 axum 应用路由树 (含 Swagger UI 与 CORS)。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
pub fn build_router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(notify::notify))
        .routes(routes!(subscriber::count_subscribers))
        .routes(routes!(health::health))
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// # Summary
/// 在已绑定的监听器上提供服务，直到关闭信号触发。
///
/// # Logic
/// 1. 构建路由。
/// 2. 启动 axum 服务并挂接优雅关闭：收到信号后停止接收新连接，等待进行中的请求结束。
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// # Summary
/// 绑定地址并启动 HTTP 服务。
///
/// # Arguments
/// * `state` - 共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8080"`
/// * `shutdown` - 进程级关闭信号
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("slotbot API server listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    serve(listener, state, shutdown).await?;
    tracing::info!("API server stopped");
    Ok(())
}
