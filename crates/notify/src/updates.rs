use crate::telegram::ApiResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slotbot_core::command::entity::InboundMessage;
use slotbot_core::command::error::SourceError;
use slotbot_core::command::port::CommandSource;
use slotbot_core::common::SubscriberId;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;

/// HTTP 超时在长轮询超时之上额外预留的时间
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// # Summary
/// 基于 `getUpdates` 长轮询的入站指令来源。
///
/// # Invariants
/// - `offset` 单调递增，已确认的更新不会被重复返回。
/// - 同一时刻只应有一个调用方轮询 (Telegram 不允许并发 getUpdates)。
pub struct TelegramUpdates {
    api_base: String,
    bot_token: String,
    // 长轮询超时 (秒)
    poll_timeout_secs: u64,
    // 下一次请求的起始 update_id
    offset: AtomicI64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GetUpdatesPayload {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Deserialize, Debug)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

impl TelegramUpdates {
    /// # Summary
    /// 创建长轮询来源。
    ///
    /// # Logic
    /// 1. HTTP 客户端超时设置为 `poll_timeout_secs` 加上固定余量，避免长轮询被客户端提前中断。
    ///
    /// # Returns
    /// * 客户端构建失败时返回 `SourceError::Network`。
    pub fn new(
        api_base: &str,
        bot_token: String,
        poll_timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs) + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            poll_timeout_secs,
            offset: AtomicI64::new(0),
            client,
        })
    }

    /// 下一次轮询使用的 offset。
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::SeqCst)
    }
}

/// 从一批更新中提取文本消息，并返回下一次轮询应使用的 offset。
fn extract(updates: Vec<Update>, current_offset: i64) -> (Vec<InboundMessage>, i64) {
    let mut next_offset = current_offset;
    let mut messages = Vec::with_capacity(updates.len());

    for update in updates {
        next_offset = next_offset.max(update.update_id + 1);
        // 忽略非文本消息 (贴纸、图片等)
        if let Some(Message {
            chat,
            text: Some(text),
        }) = update.message
        {
            messages.push(InboundMessage {
                chat: SubscriberId(chat.id),
                text,
            });
        }
    }

    (messages, next_offset)
}

#[async_trait]
impl CommandSource for TelegramUpdates {
    /// # Summary
    /// 执行一次 `getUpdates` 长轮询。
    ///
    /// # Logic
    /// 1. 以当前 offset 请求新更新，只订阅 `message` 类型。
    /// 2. 解析响应，`ok == false` 视为平台错误。
    /// 3. 提取文本消息并推进 offset。
    async fn next_batch(&self) -> Result<Vec<InboundMessage>, SourceError> {
        let url = format!("{}/bot{}/getUpdates", self.api_base, self.bot_token);
        let current = self.offset();

        let payload = GetUpdatesPayload {
            offset: current,
            timeout: self.poll_timeout_secs,
            allowed_updates: ["message"],
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.without_url().to_string()))?;

        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| SourceError::Platform(e.without_url().to_string()))?;

        if !body.ok {
            return Err(SourceError::Platform(
                body.description
                    .unwrap_or_else(|| "getUpdates failed".to_string()),
            ));
        }

        let (messages, next_offset) = extract(body.result.unwrap_or_default(), current);
        self.offset.fetch_max(next_offset, Ordering::SeqCst);

        if !messages.is_empty() {
            debug!("Received {} inbound messages, next offset {}", messages.len(), next_offset);
        }
        Ok(messages)
    }
}
