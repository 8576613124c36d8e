//! 跨 crate 测试使用的内存替身 (需开启 `test-utils` feature)。

use crate::command::entity::InboundMessage;
use crate::command::error::SourceError;
use crate::command::port::CommandSource;
use crate::common::SubscriberId;
use crate::limiter::error::LimiterError;
use crate::limiter::port::RateLimiter;
use crate::notify::error::DeliveryError;
use crate::notify::port::{DeliveryChannel, OutboundMessage};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// # Summary
/// 记录所有投递的推送通道替身，可按目标预设失败。
///
/// # Invariants
/// - 只有成功的投递会进入 `sent` 列表，失败的投递只计入 `attempts`。
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(SubscriberId, OutboundMessage)>>,
    failures: DashMap<SubscriberId, DeliveryError>,
    delay: Option<Duration>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次投递前挂起指定时长，用于观察并发与 join 行为。
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// 之后发往 `target` 的投递均返回 `err`。
    pub fn fail_for(&self, target: SubscriberId, err: DeliveryError) {
        self.failures.insert(target, err);
    }

    pub async fn sent(&self) -> Vec<(SubscriberId, OutboundMessage)> {
        self.sent.lock().await.clone()
    }

    /// 成功投递的目标 (升序)。
    pub async fn recipients(&self) -> Vec<SubscriberId> {
        let mut ids: Vec<SubscriberId> = self.sent.lock().await.iter().map(|(id, _)| *id).collect();
        ids.sort();
        ids
    }

    /// 成功发往 `target` 的正文，按发送顺序。
    pub async fn texts_for(&self, target: SubscriberId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == target)
            .map(|(_, msg)| msg.text.clone())
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(
        &self,
        target: SubscriberId,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.failures.get(&target) {
            Some(err) => Err(err.value().clone()),
            None => {
                self.sent.lock().await.push((target, message.clone()));
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// # Summary
/// 不做等待的限流器替身，只统计获取次数并响应取消。
#[derive(Default)]
pub struct UnlimitedLimiter {
    acquired: AtomicUsize,
}

impl UnlimitedLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimiter for UnlimitedLimiter {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), LimiterError> {
        if cancel.is_cancelled() {
            return Err(LimiterError::Cancelled);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// # Summary
/// 按预设批次返回消息的指令来源替身。
///
/// # Invariants
/// - 批次耗尽后每次调用短暂挂起并返回空批次，模拟空闲的长轮询。
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Result<Vec<InboundMessage>, SourceError>>>,
    polls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_batch(&self, batch: Vec<InboundMessage>) {
        self.batches.lock().await.push_back(Ok(batch));
    }

    pub async fn push_error(&self, err: SourceError) {
        self.batches.lock().await.push_back(Err(err));
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandSource for ScriptedSource {
    async fn next_batch(&self) -> Result<Vec<InboundMessage>, SourceError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().await.pop_front();
        match next {
            Some(batch) => batch,
            None => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }
}
