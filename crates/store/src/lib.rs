//! # `slotbot-store` - 订阅者存储适配器
//!
//! - [`subscriber::SqliteSubscriberStore`]: 基于 SQLite 的持久化实现。
//! - [`memory::MemorySubscriberStore`]: 基于 DashMap 的进程内实现。

pub mod config;
pub mod memory;
pub mod subscriber;
