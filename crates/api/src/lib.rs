//! # `slotbot-api` - HTTP 触发入口
//!
//! 使用 `axum` 构建路由，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收外部检测程序推送的放号结果并触发广播
//! - 提供订阅者数量查询与健康检查
//! - 将领域模型转换为 DTO 返回

pub mod error;
pub mod routes;
pub mod server;
pub mod types;
