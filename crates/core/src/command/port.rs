use crate::command::entity::InboundMessage;
use crate::command::error::SourceError;
use async_trait::async_trait;

/// # Summary
/// 入站指令来源接口。
///
/// # Invariants
/// - 每次调用返回一批新消息，已返回的消息不会再次出现。
/// - 允许长时间挂起 (长轮询)，调用方负责用取消信号中断。
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// # Summary
    /// 拉取下一批入站消息。
    ///
    /// # Returns
    /// * 成功返回消息列表 (可能为空)。
    /// * 失败返回 `SourceError`。
    async fn next_batch(&self) -> Result<Vec<InboundMessage>, SourceError>;
}
