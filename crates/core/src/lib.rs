//! # `slotbot-core` - 领域模型与端口定义
//!
//! 订阅者、过滤标签、通知结果等实体，以及存储、推送通道、限流器、指令来源的抽象接口。
//! 本 crate 不包含任何具体实现，所有适配器位于各自的 crate 中并通过 `Arc<dyn Trait>` 注入。

pub mod command;
pub mod common;
pub mod config;
pub mod limiter;
pub mod notify;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testing;
