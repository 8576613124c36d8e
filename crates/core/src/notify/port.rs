use crate::common::SubscriberId;
use crate::notify::error::DeliveryError;
use async_trait::async_trait;

/// # Summary
/// 随消息附带的回复键盘。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// 自定义键盘，每个内层 Vec 为一行按钮文本
    Keyboard(Vec<Vec<String>>),
    /// 移除当前键盘
    RemoveKeyboard,
}

/// # Summary
/// 一条待发送的出站消息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl OutboundMessage {
    /// 纯文本消息。
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    /// 附带回复键盘的消息。
    pub fn with_markup(text: impl Into<String>, markup: ReplyMarkup) -> Self {
        Self {
            text: text.into(),
            markup: Some(markup),
        }
    }
}

/// # Summary
/// 外部推送通道的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持并发调用。
/// - 实现负责把平台错误分类为 `DeliveryError::PermanentBlock` 或 `DeliveryError::Transient`。
/// - 实现本身不做限流与重试。
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// # Summary
    /// 向单个会话发送一条消息。
    ///
    /// # Logic
    /// 1. 根据目标平台要求格式化消息。
    /// 2. 通过底层传输协议发送消息。
    /// 3. 将平台返回的失败归类。
    ///
    /// # Arguments
    /// * `target` - 目标会话。
    /// * `message` - 消息正文及可选键盘。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`。
    /// * 失败返回 `Err(DeliveryError)`。
    async fn send(&self, target: SubscriberId, message: &OutboundMessage)
    -> Result<(), DeliveryError>;
}
