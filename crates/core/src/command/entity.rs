use crate::common::SubscriberId;
use serde::{Deserialize, Serialize};

/// # Summary
/// 来自指令来源的一条入站文本消息。
///
/// # Invariants
/// - `text` 为订阅者发送的原始文本 (按钮文本或斜杠指令)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    // 发送者所在会话
    pub chat: SubscriberId,
    // 原始文本
    pub text: String,
}
