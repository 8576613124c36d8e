use slotbot_core::common::SubscriberId;
use slotbot_core::limiter::port::RateLimiter;
use slotbot_core::notify::error::SendError;
use slotbot_core::notify::port::{DeliveryChannel, OutboundMessage};
use slotbot_core::store::error::StoreError;
use slotbot_core::store::port::SubscriberStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// # Summary
/// 单条消息的发送者：先过限流器，再调用推送通道，并对永久屏蔽做出处理。
///
/// # Invariants
/// - 每一次出站调用都先从共享限流器获取令牌，不存在绕过限流的发送路径。
/// - 除显式退订外，这是唯一会删除订阅者的组件。
/// - 不做任何重试。
pub struct Dispatcher {
    // 推送通道
    channel: Arc<dyn DeliveryChannel>,
    // 订阅者存储 (仅用于删除屏蔽者)
    store: Arc<dyn SubscriberStore>,
    // 进程级共享限流器
    limiter: Arc<dyn RateLimiter>,
    // 进程关闭信号，传递给限流等待
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// # Summary
    /// 创建 Dispatcher 实例。
    ///
    /// # Arguments
    /// * `channel` - 推送通道实现。
    /// * `store` - 订阅者存储实现。
    /// * `limiter` - 全进程共享的限流器。
    /// * `shutdown` - 进程级取消信号。
    ///
    /// # Returns
    /// * `Arc<Self>` - 可在广播任务与指令处理任务之间共享。
    pub fn new(
        channel: Arc<dyn DeliveryChannel>,
        store: Arc<dyn SubscriberStore>,
        limiter: Arc<dyn RateLimiter>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            channel,
            store,
            limiter,
            shutdown,
        })
    }

    /// # Summary
    /// 向单个订阅者发送纯文本。
    pub async fn send(&self, message: &str, target: SubscriberId) -> Result<(), SendError> {
        self.send_message(target, &OutboundMessage::text(message))
            .await
    }

    /// # Summary
    /// 向单个订阅者发送消息 (可附带键盘)。
    ///
    /// # Logic
    /// 1. 获取限流令牌，只会因关闭信号失败。
    /// 2. 调用推送通道。
    /// 3. 若失败被归类为永久屏蔽，删除该订阅者；删除失败只记录日志。
    /// 4. 无论删除是否成功，都向调用方返回原始投递错误。
    ///
    /// # Arguments
    /// * `target` - 目标会话。
    /// * `message` - 待发送消息。
    ///
    /// # Returns
    /// * `Ok(())` 投递成功。
    /// * `Err(SendError::Cancelled)` 等待令牌期间进程关闭。
    /// * `Err(SendError::Delivery)` 推送通道返回失败。
    pub async fn send_message(
        &self,
        target: SubscriberId,
        message: &OutboundMessage,
    ) -> Result<(), SendError> {
        self.limiter.acquire(&self.shutdown).await?;

        let err = match self.channel.send(target, message).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if err.is_permanent() {
            warn!("Chat {} revoked delivery, removing subscriber: {}", target, err);
            match self.store.delete(target).await {
                Ok(_) => debug!("Subscriber {} deleted", target),
                Err(StoreError::NotFound(_)) => {
                    debug!("Chat {} had no subscriber record to delete", target)
                }
                Err(e) => error!("Failed to delete blocked subscriber {}: {}", target, e),
            }
        }

        Err(err.into())
    }
}
