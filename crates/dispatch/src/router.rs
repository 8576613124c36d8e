use crate::command::{Command, EVERYTHING_BUTTON, filter_keyboard, main_keyboard};
use crate::dispatcher::Dispatcher;
use slotbot_core::common::{FilterTag, SubscriberId};
use slotbot_core::notify::error::SendError;
use slotbot_core::notify::port::{OutboundMessage, ReplyMarkup};
use slotbot_core::store::error::StoreError;
use slotbot_core::store::port::{Subscriber, SubscriberStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

pub const WELCOME_TEXT: &str = "Welcome to covid bot";
pub const UNSUBSCRIBED_TEXT: &str =
    "You will no longer receive vaccine updates. Send /start to subscribe again.";
pub const EVERYTHING_TEXT: &str = "subscribed to every updates";
pub const CONTRIBUTE_TEXT: &str =
    "Thanks for using covid bot! Feedback and contributions are always welcome.";

/// # Summary
/// 指令处理错误。只在内部记录日志，不会反馈给订阅者。
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

/// 设置过滤后的确认文本。
pub fn filter_ack(tag: Option<FilterTag>) -> String {
    match tag {
        Some(tag) => format!("subscribed to {} updates", tag.label()),
        None => EVERYTHING_TEXT.to_string(),
    }
}

/// 描述订阅者当前的过滤设置。
pub fn describe_filters(subscriber: &Subscriber) -> String {
    let filters = if subscriber.filters.is_empty() {
        "unfiltered".to_string()
    } else {
        subscriber
            .filters
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "your current filters are :\n{}\n\nSelect {} to reset them",
        filters, EVERYTHING_BUTTON
    )
}

/// # Summary
/// 指令路由器：把订阅者发来的文本映射为订阅状态变更，并回复一条确认。
///
/// # Invariants
/// - 未识别的文本不做任何处理。
/// - 涉及存储的指令在存储操作成功后恰好发送一条确认；存储失败时不发送确认。
/// - 所有回复都经由 `Dispatcher`，共享限流。
pub struct CommandRouter {
    store: Arc<dyn SubscriberStore>,
    dispatcher: Arc<Dispatcher>,
}

impl CommandRouter {
    pub fn new(store: Arc<dyn SubscriberStore>, dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self { store, dispatcher })
    }

    /// # Summary
    /// 处理一条入站文本 (fire-and-forget)。
    ///
    /// # Logic
    /// 1. 解析文本，未识别则忽略。
    /// 2. 执行指令，错误只记录日志。
    ///
    /// # Arguments
    /// * `target` - 发送者会话。
    /// * `raw_text` - 原始文本。
    pub async fn handle(&self, target: SubscriberId, raw_text: &str) {
        let Some(command) = Command::parse(raw_text) else {
            debug!("Ignoring unrecognized text from chat {}", target);
            return;
        };

        if command.touches_store() {
            info!("Chat {} issued {:?}", target, command);
        }

        if let Err(e) = self.execute(target, command, raw_text).await {
            error!("Command {:?} from chat {} failed: {}", command, target, e);
        }
    }

    /// # Summary
    /// 执行已解析的指令，并把失败以 `RouterError` 交还调用方。
    ///
    /// `handle` 面向入站循环，失败只记录日志；需要区分存储失败与发送失败的调用方
    /// (如测试或其他入口) 直接调用本方法。
    ///
    /// # Logic
    /// 1. 订阅：新建记录，已存在则重新启用 (过滤不变)。
    /// 2. 退订：置为未启用。
    /// 3. 设置过滤：替换过滤集合 (存储层按需创建记录)。
    /// 4. 查询过滤：读取记录并回复描述。
    /// 5. 菜单类指令：不访问存储，回显原文并附带键盘。
    ///
    /// # Returns
    /// * 存储或发送失败时返回 `RouterError`；存储失败时不会发送确认。
    pub async fn execute(
        &self,
        target: SubscriberId,
        command: Command,
        raw_text: &str,
    ) -> Result<(), RouterError> {
        match command {
            Command::Subscribe => {
                self.subscribe(target).await?;
                self.dispatcher.send(WELCOME_TEXT, target).await?;
            }
            Command::Unsubscribe => {
                self.store.disable(target).await?;
                self.dispatcher.send(UNSUBSCRIBED_TEXT, target).await?;
            }
            Command::SetFilter(tag) => {
                self.store.update_filters(target, tag).await?;
                self.dispatcher.send(&filter_ack(tag), target).await?;
            }
            Command::QueryFilters => {
                let subscriber = self.store.find(target).await?;
                self.dispatcher
                    .send(&describe_filters(&subscriber), target)
                    .await?;
            }
            Command::ShowMenu => self.reply_with_markup(target, raw_text, main_keyboard()).await?,
            Command::ShowFilterMenu => {
                self.reply_with_markup(target, raw_text, filter_keyboard())
                    .await?
            }
            Command::HideMenu => {
                self.reply_with_markup(target, raw_text, ReplyMarkup::RemoveKeyboard)
                    .await?
            }
            Command::Contribute => self.dispatcher.send(CONTRIBUTE_TEXT, target).await?,
        }
        Ok(())
    }

    /// 新建订阅者；已存在时重新启用。
    async fn subscribe(&self, target: SubscriberId) -> Result<Subscriber, StoreError> {
        match self.store.create(target).await {
            Err(StoreError::AlreadyExists(_)) => {
                debug!("Chat {} already known, re-enabling", target);
                self.store.enable(target).await
            }
            other => other,
        }
    }

    async fn reply_with_markup(
        &self,
        target: SubscriberId,
        raw_text: &str,
        markup: ReplyMarkup,
    ) -> Result<(), SendError> {
        self.dispatcher
            .send_message(target, &OutboundMessage::with_markup(raw_text.trim(), markup))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_filter_ack_texts() {
        assert_eq!(
            filter_ack(Some(FilterTag::AstraZeneca)),
            "subscribed to AstraZeneca updates"
        );
        assert_eq!(
            filter_ack(Some(FilterTag::JohnsonAndJohnson)),
            "subscribed to Johnson And Johnson updates"
        );
        assert_eq!(filter_ack(None), "subscribed to every updates");
    }

    #[test]
    fn test_describe_filters() {
        let mut sub = Subscriber::new(SubscriberId(1));
        assert!(describe_filters(&sub).contains("unfiltered"));

        sub.filters = BTreeSet::from([FilterTag::Mrna]);
        let text = describe_filters(&sub);
        assert!(text.contains("MRNA vaccines"));
        assert!(text.ends_with("Select Look for everything to reset them"));
    }
}
