use async_trait::async_trait;
use slotbot_core::config::LimiterConfig;
use slotbot_core::limiter::error::LimiterError;
use slotbot_core::limiter::port::RateLimiter;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// # Summary
/// 预约式令牌桶限流器。
///
/// # Invariants
/// - `tokens` 可以为负，负值表示已被预约、尚未补充的令牌数。
/// - 所有预约在同一把锁内完成，不会重复发放令牌；调用方按预约顺序依次放行。
/// - 取消的等待只归还之后的预约尚未依赖的那部分令牌，已排定的放行时刻之间始终间隔 `1 / rate`。
pub struct TokenBucketLimiter {
    // 每秒补充的令牌数
    rate: f64,
    // 桶容量 (突发上限)
    burst: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_update: Instant,
    // 最近一次预约的放行时刻
    last_event: Instant,
}

impl TokenBucketLimiter {
    /// # Summary
    /// 创建令牌桶，初始为满桶。
    ///
    /// # Logic
    /// 1. `burst` 至少为 1。
    /// 2. 非正或非有限的 `rate_per_second` 回落到默认配置并记录告警。
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        let rate = if rate_per_second.is_finite() && rate_per_second > 0.0 {
            rate_per_second
        } else {
            let fallback = LimiterConfig::default().rate_per_second;
            warn!(
                "Invalid limiter rate {}, falling back to {}/s",
                rate_per_second, fallback
            );
            fallback
        };
        let burst = f64::from(burst.max(1));

        Self {
            rate,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_update: Instant::now(),
                last_event: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &LimiterConfig) -> Self {
        Self::new(config.rate_per_second, config.burst)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last_update = now;
    }

    /// 预约一个令牌，返回放行时刻与需要等待的时长。
    async fn reserve(&self) -> (Instant, Duration) {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens -= 1.0;
        let wait = if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.rate)
        };
        let act_at = state.last_update + wait;
        state.last_event = act_at;
        (act_at, wait)
    }

    /// # Summary
    /// 归还一个未使用的预约。
    ///
    /// # Logic
    /// 1. 放行时刻已过则不归还。
    /// 2. 扣除在该预约之后排定的预约所占用的令牌，剩余部分放回桶中。
    /// 3. 若它是最后一个预约，把 `last_event` 回退一个间隔。
    async fn release(&self, act_at: Instant) {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if act_at <= now {
            return;
        }

        let later = state.last_event.saturating_duration_since(act_at);
        let restore = 1.0 - later.as_secs_f64() * self.rate;
        if restore <= 0.0 {
            return;
        }

        self.refill(&mut state);
        state.tokens = (state.tokens + restore).min(self.burst);

        if act_at == state.last_event {
            let interval = Duration::from_secs_f64(1.0 / self.rate);
            if let Some(prev) = act_at.checked_sub(interval).filter(|prev| *prev >= now) {
                state.last_event = prev;
            }
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    /// # Logic
    /// 1. 已取消则直接返回，不做预约。
    /// 2. 预约令牌；无需等待时立即放行。
    /// 3. 在预约时长与取消信号之间择先；取消时归还预约。
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), LimiterError> {
        if cancel.is_cancelled() {
            return Err(LimiterError::Cancelled);
        }

        let (act_at, wait) = self.reserve().await;
        if wait.is_zero() {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.release(act_at).await;
                Err(LimiterError::Cancelled)
            }
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}
