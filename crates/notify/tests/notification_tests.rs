use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};
use slotbot_core::command::port::CommandSource;
use slotbot_core::common::SubscriberId;
use slotbot_core::notify::error::DeliveryError;
use slotbot_core::notify::port::{DeliveryChannel, OutboundMessage, ReplyMarkup};
use slotbot_notify::telegram::TelegramChannel;
use slotbot_notify::updates::TelegramUpdates;
use std::env;
use tokio::net::TcpListener;

const TOKEN: &str = "test-token";

/// 模拟 sendMessage：chat 7 已屏蔽机器人，chat 8 触发限流，其余成功。
async fn fake_send_message(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body["chat_id"].as_i64() {
        Some(7) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })),
        ),
        Some(8) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 5",
                "parameters": {"retry_after": 5}
            })),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({"ok": true, "result": {"message_id": 1, "echo": body}})),
        ),
    }
}

/// 模拟 getUpdates：offset 为 0 时返回两条更新，之后返回空。
async fn fake_get_updates(Json(body): Json<Value>) -> Json<Value> {
    if body["offset"].as_i64() == Some(0) {
        Json(json!({
            "ok": true,
            "result": [
                {"update_id": 100, "message": {"chat": {"id": 42}, "text": "/start"}},
                {"update_id": 101, "message": {"chat": {"id": 43}, "text": "Stop"}}
            ]
        }))
    } else {
        Json(json!({"ok": true, "result": []}))
    }
}

// 帮助函数：在随机端口启动模拟的 Bot API
async fn spawn_fake_api() -> String {
    rustls::crypto::ring::default_provider().install_default().ok();

    let app = Router::new()
        .route(&format!("/bot{}/sendMessage", TOKEN), post(fake_send_message))
        .route(&format!("/bot{}/getUpdates", TOKEN), post(fake_get_updates));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_send_message_classifies_failures() {
    let base = spawn_fake_api().await;
    let channel = TelegramChannel::new(&base, TOKEN.to_string());

    let ok = channel
        .send(SubscriberId(42), &OutboundMessage::text("slot open"))
        .await;
    assert!(ok.is_ok(), "send failed: {:?}", ok);

    let keyboard = OutboundMessage::with_markup(
        "open",
        ReplyMarkup::Keyboard(vec![vec!["Start".into(), "Stop".into()]]),
    );
    assert!(channel.send(SubscriberId(42), &keyboard).await.is_ok());

    let blocked = channel
        .send(SubscriberId(7), &OutboundMessage::text("slot open"))
        .await;
    assert_eq!(
        blocked,
        Err(DeliveryError::PermanentBlock(
            "Forbidden: bot was blocked by the user".into()
        ))
    );

    let limited = channel
        .send(SubscriberId(8), &OutboundMessage::text("slot open"))
        .await;
    assert!(matches!(limited, Err(DeliveryError::Transient(_))));
}

#[tokio::test]
async fn test_unreachable_api_is_transient() {
    rustls::crypto::ring::default_provider().install_default().ok();
    // 端口 9 (discard) 通常无人监听
    let channel = TelegramChannel::new("http://127.0.0.1:9", TOKEN.to_string());
    let result = channel
        .send(SubscriberId(1), &OutboundMessage::text("hello"))
        .await;
    assert!(matches!(result, Err(DeliveryError::Transient(_))));
}

#[tokio::test]
async fn test_get_updates_advances_offset() {
    let base = spawn_fake_api().await;
    let updates = TelegramUpdates::new(&base, TOKEN.to_string(), 1).unwrap();

    let first = updates.next_batch().await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].chat, SubscriberId(42));
    assert_eq!(first[0].text, "/start");
    assert_eq!(first[1].text, "Stop");
    assert_eq!(updates.offset(), 102);

    let second = updates.next_batch().await.unwrap();
    assert!(second.is_empty());
    assert_eq!(updates.offset(), 102);
}

/// # Summary
/// 集成测试：验证真实 Telegram 投递。
///
/// # Logic
/// 1. 加载 .env 环境变量。
/// 2. 从环境变量获取 Bot Token 和 Chat ID。
/// 3. 发送测试消息并断言结果。
#[tokio::test]
#[ignore] // 默认忽略，仅在手动测试时通过环境变量开启
async fn test_telegram_live_delivery() {
    dotenvy::dotenv().ok();
    rustls::crypto::ring::default_provider().install_default().ok();
    let bot_token = env::var("SLOTBOT_TG_BOT_TOKEN").expect("SLOTBOT_TG_BOT_TOKEN must be set");
    let chat_id: i64 = env::var("SLOTBOT_TG_CHAT_ID")
        .expect("SLOTBOT_TG_CHAT_ID must be set")
        .parse()
        .expect("SLOTBOT_TG_CHAT_ID must be an integer");

    let channel = TelegramChannel::new("https://api.telegram.org", bot_token);
    let result = channel
        .send(
            SubscriberId(chat_id),
            &OutboundMessage::text("slotbot integration test"),
        )
        .await;

    assert!(result.is_ok(), "Telegram delivery failed: {:?}", result);
}
