use crate::dispatcher::Dispatcher;
use slotbot_core::common::{NotificationResult, SubscriberId};
use slotbot_core::notify::error::{DeliveryError, SendError};
use slotbot_core::store::error::StoreError;
use slotbot_core::store::port::SubscriberStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// # Summary
/// 广播级错误。单个订阅者的投递失败不会出现在这里。
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// 查询订阅者失败，未发送任何消息
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 广播任务自身异常退出
    #[error("Broadcast task aborted: {0}")]
    Aborted(String),
}

/// # Summary
/// 一次广播的投递统计。
///
/// # Invariants
/// - `recipients == delivered + pruned + failed + cancelled`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    // 查询到的匹配订阅者数
    pub recipients: usize,
    // 成功投递数
    pub delivered: usize,
    // 因永久屏蔽被移除的订阅者数
    pub pruned: usize,
    // 其他投递失败 (含任务异常)
    pub failed: usize,
    // 因进程关闭未发出的数量
    pub cancelled: usize,
}

/// # Summary
/// 广播器：把一次通知结果扇出给所有匹配的订阅者。
///
/// # Invariants
/// - 每个订阅者一个独立任务，并发度只受共享限流器约束。
/// - `notify` 返回前所有发送任务均已结束；调用方中途放弃等待也不会中断广播。
/// - 单个订阅者的失败不会中断其他发送，也不会提升为广播级错误。
pub struct Broadcaster {
    store: Arc<dyn SubscriberStore>,
    dispatcher: Arc<Dispatcher>,
}

impl Broadcaster {
    pub fn new(store: Arc<dyn SubscriberStore>, dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self { store, dispatcher })
    }

    /// # Summary
    /// 广播一条通知结果。
    ///
    /// # Logic
    /// 1. 扇出在独立的后台任务中执行，调用方被取消 (例如 HTTP 客户端断开) 时广播仍会完整进行。
    /// 2. 等待该任务结束并返回其统计。
    ///
    /// # Arguments
    /// * `result` - 外部触发源产生的通知结果。
    ///
    /// # Returns
    /// * `Ok(BroadcastReport)` 只要查询成功即返回，与单个投递结果无关。
    /// * `Err(BroadcastError::Store)` 查询订阅者失败。
    pub async fn notify(&self, result: &NotificationResult) -> Result<BroadcastReport, BroadcastError> {
        let store = self.store.clone();
        let dispatcher = self.dispatcher.clone();
        let result = result.clone();
        let handle = tokio::spawn(async move { fan_out(store, dispatcher, result).await });

        handle
            .await
            .map_err(|e| BroadcastError::Aborted(e.to_string()))?
    }
}

/// # Summary
/// 查询匹配的订阅者并并发发送，等待全部任务结束。
///
/// # Logic
/// 1. 查询该类别下应接收的启用订阅者；查询失败直接返回错误，不发送任何消息。
/// 2. 为每个订阅者 spawn 一个发送任务。
/// 3. 等待全部任务结束，逐个记录失败并汇总统计。
async fn fan_out(
    store: Arc<dyn SubscriberStore>,
    dispatcher: Arc<Dispatcher>,
    result: NotificationResult,
) -> Result<BroadcastReport, BroadcastError> {
    let subscribers = store.list(Some(result.category)).await?;
    info!(
        "Broadcasting {} update to {} subscribers: {}",
        result.category,
        subscribers.len(),
        result.message
    );

    let message: Arc<str> = Arc::from(result.message.as_str());
    let mut tasks: JoinSet<(SubscriberId, Result<(), SendError>)> = JoinSet::new();
    for subscriber in &subscribers {
        let dispatcher = dispatcher.clone();
        let message = message.clone();
        let target = subscriber.id;
        tasks.spawn(async move { (target, dispatcher.send(&message, target).await) });
    }

    let mut report = BroadcastReport {
        recipients: subscribers.len(),
        ..BroadcastReport::default()
    };

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => report.delivered += 1,
            Ok((target, Err(SendError::Delivery(DeliveryError::PermanentBlock(reason))))) => {
                warn!("Subscriber {} pruned during broadcast: {}", target, reason);
                report.pruned += 1;
            }
            Ok((target, Err(SendError::Cancelled(_)))) => {
                warn!("Broadcast to {} cancelled by shutdown", target);
                report.cancelled += 1;
            }
            Ok((target, Err(e))) => {
                error!("Failed to deliver to {}: {}", target, e);
                report.failed += 1;
            }
            Err(e) => {
                error!("Broadcast send task aborted: {}", e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Broadcast finished: {} delivered, {} pruned, {} failed, {} cancelled",
        report.delivered, report.pruned, report.failed, report.cancelled
    );
    Ok(report)
}
