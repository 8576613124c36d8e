use async_trait::async_trait;
use slotbot_core::common::{FilterTag, NotificationResult, SubscriberId};
use slotbot_core::notify::error::DeliveryError;
use slotbot_core::store::error::StoreError;
use slotbot_core::store::port::{Subscriber, SubscriberStore};
use slotbot_core::testing::{RecordingChannel, UnlimitedLimiter};
use slotbot_dispatch::broadcaster::{BroadcastError, BroadcastReport, Broadcaster};
use slotbot_dispatch::dispatcher::Dispatcher;
use slotbot_dispatch::limiter::TokenBucketLimiter;
use slotbot_dispatch::router::{CommandRouter, WELCOME_TEXT};
use slotbot_store::memory::MemorySubscriberStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Harness {
    store: Arc<MemorySubscriberStore>,
    channel: Arc<RecordingChannel>,
    broadcaster: Arc<Broadcaster>,
}

fn harness(channel: RecordingChannel) -> Harness {
    let store = Arc::new(MemorySubscriberStore::new());
    let channel = Arc::new(channel);
    let dispatcher = Dispatcher::new(
        channel.clone(),
        store.clone(),
        Arc::new(UnlimitedLimiter::new()),
        CancellationToken::new(),
    );
    let broadcaster = Broadcaster::new(store.clone(), dispatcher);
    Harness {
        store,
        channel,
        broadcaster,
    }
}

fn result(category: FilterTag, message: &str) -> NotificationResult {
    NotificationResult {
        category,
        message: message.to_string(),
    }
}

fn ids(raw: &[i64]) -> Vec<SubscriberId> {
    raw.iter().copied().map(SubscriberId).collect()
}

#[tokio::test]
async fn test_broadcast_reaches_exactly_matching_subscribers() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::new());
    for id in 1..=4 {
        h.store.create(SubscriberId(id)).await?;
    }
    h.store
        .update_filters(SubscriberId(2), Some(FilterTag::AstraZeneca))
        .await?;
    h.store
        .update_filters(SubscriberId(3), Some(FilterTag::Mrna))
        .await?;
    h.store.disable(SubscriberId(4)).await?;

    let report = h
        .broadcaster
        .notify(&result(FilterTag::Mrna, "Pfizer slots in Paris"))
        .await?;

    assert_eq!(h.channel.recipients().await, ids(&[1, 3]));
    assert_eq!(
        report,
        BroadcastReport {
            recipients: 2,
            delivered: 2,
            ..BroadcastReport::default()
        }
    );
    for (_, msg) in h.channel.sent().await {
        assert_eq!(msg.text, "Pfizer slots in Paris");
        assert!(msg.markup.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_subscriber_filter_scenario() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::new());
    for id in [1, 2, 42] {
        h.store.create(SubscriberId(id)).await?;
    }
    h.store
        .update_filters(SubscriberId(42), Some(FilterTag::AstraZeneca))
        .await?;

    h.broadcaster
        .notify(&result(FilterTag::JohnsonAndJohnson, "J&J"))
        .await?;
    assert_eq!(h.channel.recipients().await, ids(&[1, 2]));

    h.broadcaster
        .notify(&result(FilterTag::AstraZeneca, "AZ"))
        .await?;
    assert_eq!(h.channel.texts_for(SubscriberId(42)).await, vec!["AZ"]);
    assert_eq!(h.channel.texts_for(SubscriberId(1)).await, vec!["J&J", "AZ"]);
    Ok(())
}

#[tokio::test]
async fn test_commands_drive_broadcast_targeting() -> anyhow::Result<()> {
    let store = Arc::new(MemorySubscriberStore::new());
    let channel = Arc::new(RecordingChannel::new());
    let dispatcher = Dispatcher::new(
        channel.clone(),
        store.clone(),
        Arc::new(UnlimitedLimiter::new()),
        CancellationToken::new(),
    );
    let router = CommandRouter::new(store.clone(), dispatcher.clone());
    let broadcaster = Broadcaster::new(store.clone(), dispatcher);
    let chat = SubscriberId(42);

    router.handle(chat, "start").await;
    assert!(store.is_empty(), "plain 'start' is not a command");
    router.handle(chat, "Start").await;
    router.handle(chat, "Look for AstraZeneca").await;

    broadcaster
        .notify(&result(FilterTag::JohnsonAndJohnson, "slot open"))
        .await?;
    broadcaster
        .notify(&result(FilterTag::AstraZeneca, "AZ slot open"))
        .await?;

    assert_eq!(
        channel.texts_for(chat).await,
        vec![
            WELCOME_TEXT,
            "subscribed to AstraZeneca updates",
            "AZ slot open"
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_notify_returns_only_after_every_send_finished() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::with_delay(Duration::from_millis(250)));
    for id in 1..=20 {
        h.store.create(SubscriberId(id)).await?;
    }

    let report = h
        .broadcaster
        .notify(&result(FilterTag::AstraZeneca, "slow"))
        .await?;

    assert_eq!(report.delivered, 20);
    assert_eq!(h.channel.in_flight(), 0);
    assert_eq!(h.channel.recipients().await.len(), 20);
    // 无限流时所有发送并发进行
    assert!(h.channel.max_in_flight() > 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_notify_still_reaches_everyone() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::with_delay(Duration::from_millis(500)));
    for id in 1..=10 {
        h.store.create(SubscriberId(id)).await?;
    }

    // 调用方在发送完成前放弃等待
    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        h.broadcaster.notify(&result(FilterTag::Mrna, "keep going")),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.channel.recipients().await.len(), 10);
    assert_eq!(h.channel.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn test_permanent_block_prunes_only_that_subscriber() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::new());
    for id in 1..=10 {
        h.store.create(SubscriberId(id)).await?;
    }
    h.channel.fail_for(
        SubscriberId(7),
        DeliveryError::PermanentBlock("Forbidden: bot was blocked by the user".into()),
    );

    let report = h
        .broadcaster
        .notify(&result(FilterTag::Mrna, "moderna"))
        .await?;

    assert_eq!(report.recipients, 10);
    assert_eq!(report.delivered, 9);
    assert_eq!(report.pruned, 1);
    assert_eq!(h.channel.attempts(), 10);
    assert_eq!(h.store.len(), 9);
    assert!(matches!(
        h.store.find(SubscriberId(7)).await,
        Err(StoreError::NotFound(_))
    ));

    // 下一次广播不再尝试被屏蔽的会话
    h.broadcaster
        .notify(&result(FilterTag::Mrna, "moderna again"))
        .await?;
    assert_eq!(h.channel.attempts(), 19);
    Ok(())
}

#[tokio::test]
async fn test_transient_failure_keeps_subscriber() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::new());
    h.store.create(SubscriberId(1)).await?;
    h.store.create(SubscriberId(2)).await?;
    h.channel.fail_for(
        SubscriberId(2),
        DeliveryError::Transient("Too Many Requests: retry after 3".into()),
    );

    let report = h
        .broadcaster
        .notify(&result(FilterTag::AstraZeneca, "az"))
        .await?;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pruned, 0);
    assert!(h.store.find(SubscriberId(2)).await?.enabled);
    Ok(())
}

#[tokio::test]
async fn test_empty_store_broadcast_is_a_no_op() -> anyhow::Result<()> {
    let h = harness(RecordingChannel::new());
    let report = h
        .broadcaster
        .notify(&result(FilterTag::AstraZeneca, "nobody"))
        .await?;
    assert_eq!(report, BroadcastReport::default());
    assert_eq!(h.channel.attempts(), 0);
    Ok(())
}

/// list 始终失败的存储。
struct BrokenStore;

#[async_trait]
impl SubscriberStore for BrokenStore {
    async fn create(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        Ok(Subscriber::new(id))
    }
    async fn enable(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        Err(StoreError::NotFound(id))
    }
    async fn disable(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        Err(StoreError::NotFound(id))
    }
    async fn delete(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        Err(StoreError::NotFound(id))
    }
    async fn find(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        Err(StoreError::NotFound(id))
    }
    async fn list(&self, _category: Option<FilterTag>) -> Result<Vec<Subscriber>, StoreError> {
        Err(StoreError::Database("disk I/O error".into()))
    }
    async fn update_filters(
        &self,
        id: SubscriberId,
        _tag: Option<FilterTag>,
    ) -> Result<Subscriber, StoreError> {
        Err(StoreError::NotFound(id))
    }
}

#[tokio::test]
async fn test_store_failure_aborts_broadcast_before_any_send() {
    let channel = Arc::new(RecordingChannel::new());
    let store: Arc<dyn SubscriberStore> = Arc::new(BrokenStore);
    let dispatcher = Dispatcher::new(
        channel.clone(),
        store.clone(),
        Arc::new(UnlimitedLimiter::new()),
        CancellationToken::new(),
    );
    let broadcaster = Broadcaster::new(store, dispatcher);

    let outcome = broadcaster
        .notify(&result(FilterTag::AstraZeneca, "never sent"))
        .await;

    assert!(matches!(
        outcome,
        Err(BroadcastError::Store(StoreError::Database(_)))
    ));
    assert_eq!(channel.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_respects_shared_rate_limit() -> anyhow::Result<()> {
    let store = Arc::new(MemorySubscriberStore::new());
    let channel = Arc::new(RecordingChannel::new());
    let dispatcher = Dispatcher::new(
        channel.clone(),
        store.clone(),
        Arc::new(TokenBucketLimiter::new(10.0, 1)),
        CancellationToken::new(),
    );
    let broadcaster = Broadcaster::new(store.clone(), dispatcher);
    for id in 1..=5 {
        store.create(SubscriberId(id)).await?;
    }

    let start = tokio::time::Instant::now();
    let report = broadcaster
        .notify(&result(FilterTag::Mrna, "paced"))
        .await?;
    let elapsed = start.elapsed();

    assert_eq!(report.delivered, 5);
    // 1 个突发令牌 + 4 个按 100ms 补充
    assert!(elapsed >= Duration::from_millis(398), "took {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(410), "took {:?}", elapsed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_sends() -> anyhow::Result<()> {
    let store = Arc::new(MemorySubscriberStore::new());
    let channel = Arc::new(RecordingChannel::new());
    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        channel.clone(),
        store.clone(),
        Arc::new(TokenBucketLimiter::new(1.0, 1)),
        shutdown.clone(),
    );
    let broadcaster = Broadcaster::new(store.clone(), dispatcher);
    for id in 1..=3 {
        store.create(SubscriberId(id)).await?;
    }

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let report = broadcaster
        .notify(&result(FilterTag::AstraZeneca, "late"))
        .await?;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.cancelled, 2);
    assert_eq!(channel.attempts(), 1);
    // 被取消的订阅者不会被删除
    assert_eq!(store.len(), 3);
    Ok(())
}
