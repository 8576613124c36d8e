//! # `slotbot-dispatch` - 通知扇出与指令分发引擎
//!
//! - [`limiter::TokenBucketLimiter`]: 进程级令牌桶，所有出站发送共享。
//! - [`dispatcher::Dispatcher`]: 单条发送，永久屏蔽时删除订阅者。
//! - [`broadcaster::Broadcaster`]: 按类别查询订阅者并并发扇出，等待全部完成。
//! - [`router::CommandRouter`]: 入站文本到订阅状态变更与确认回复的映射。
//! - [`ingest::CommandLoop`]: 拉取入站消息，每条消息一个任务。

pub mod broadcaster;
pub mod command;
pub mod dispatcher;
pub mod ingest;
pub mod limiter;
pub mod router;
