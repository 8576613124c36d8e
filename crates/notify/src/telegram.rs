use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use slotbot_core::common::SubscriberId;
use slotbot_core::notify::error::DeliveryError;
use slotbot_core::notify::port::{DeliveryChannel, OutboundMessage, ReplyMarkup};
use tracing::debug;

/// Telegram 用于 "被屏蔽 / 账号注销 / 被移出群组" 的错误码
const FORBIDDEN_ERROR_CODE: u16 = 403;

/// # Summary
/// 通过 Telegram Bot API 投递消息的推送通道。
///
/// # Invariants
/// * `bot_token` 必须有效。
/// * 本类型只负责单次投递与错误分类，限流由调用方的限流器完成。
pub struct TelegramChannel {
    /// API 根地址 (默认 `https://api.telegram.org`)
    api_base: String,
    /// The Bot API token.
    bot_token: String,
    /// The HTTP client used for requests.
    client: reqwest::Client,
}

/// # Summary
/// Payload structure for Telegram `sendMessage` API.
#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<MarkupPayload>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MarkupPayload {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

#[derive(Serialize)]
struct KeyboardButton {
    text: String,
}

impl From<&ReplyMarkup> for MarkupPayload {
    fn from(markup: &ReplyMarkup) -> Self {
        match markup {
            ReplyMarkup::Keyboard(rows) => MarkupPayload::Keyboard {
                keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|text| KeyboardButton { text: text.clone() })
                            .collect()
                    })
                    .collect(),
                resize_keyboard: true,
            },
            ReplyMarkup::RemoveKeyboard => MarkupPayload::Remove {
                remove_keyboard: true,
            },
        }
    }
}

/// # Summary
/// Telegram API 通用响应包装。
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<u16>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// # Summary
/// 将失败的 API 调用归类为永久屏蔽或临时错误。
///
/// # Logic
/// 1. 优先使用响应体中的 `error_code`，缺失时使用 HTTP 状态码。
/// 2. 403 (bot was blocked / user is deactivated / bot was kicked) 归为 `PermanentBlock`。
/// 3. 其余 (包括 429 限流) 归为 `Transient`，保留 `retry_after` 提示。
pub(crate) fn classify<T>(status: StatusCode, body: &ApiResponse<T>) -> DeliveryError {
    let code = body.error_code.unwrap_or(status.as_u16());
    let description = body
        .description
        .clone()
        .unwrap_or_else(|| format!("HTTP {}", status));

    if code == FORBIDDEN_ERROR_CODE {
        return DeliveryError::PermanentBlock(description);
    }

    match body.parameters.as_ref().and_then(|p| p.retry_after) {
        Some(secs) => DeliveryError::Transient(format!("{} (retry after {}s)", description, secs)),
        None => DeliveryError::Transient(description),
    }
}

impl TelegramChannel {
    /// # Summary
    /// Creates a new `TelegramChannel`.
    ///
    /// # Arguments
    /// * `api_base` - API 根地址，末尾斜杠会被去除。
    /// * `bot_token` - The Telegram Bot API token.
    pub fn new(api_base: &str, bot_token: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    /// # Summary
    /// 向指定会话发送消息。
    ///
    /// # Logic
    /// 1. Constructs the Telegram API URL.
    /// 2. 组装 payload，关闭网页预览，按需附带回复键盘。
    /// 3. Sends a POST request to the Telegram API.
    /// 4. 非成功响应交由 `classify` 分类。
    ///
    /// # Returns
    /// * `Ok(())` if the message was sent successfully.
    /// * `Err(DeliveryError)` 网络错误视为 `Transient`。
    async fn send(
        &self,
        target: SubscriberId,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let payload = SendMessagePayload {
            chat_id: target.0,
            text: &message.text,
            disable_web_page_preview: true,
            reply_markup: message.markup.as_ref().map(MarkupPayload::from),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Delivered message to chat {}", target);
            return Ok(());
        }

        // 错误响应体无法解析时仍按状态码分类
        let body: ApiResponse<serde_json::Value> = response.json().await.unwrap_or_default();
        Err(classify(status, &body))
    }
}
