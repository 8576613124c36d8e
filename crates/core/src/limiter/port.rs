use crate::limiter::error::LimiterError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// # Summary
/// 出站调用限流器接口。
///
/// # Invariants
/// - 进程内所有出站发送共享同一个实例 (构造时注入)。
/// - 并发获取不得重复发放同一个令牌。
/// - 被取消的等待不得消耗令牌。
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// # Summary
    /// 异步等待直到获得一个令牌。
    ///
    /// # Logic
    /// 1. 预约一个令牌，计算需要等待的时长。
    /// 2. 挂起直到预约时间到达或 `cancel` 被触发。
    /// 3. 取消时归还预约。
    ///
    /// # Arguments
    /// * `cancel` - 进程级取消信号。
    ///
    /// # Returns
    /// * 获得令牌返回 `Ok(())`。
    /// * 被取消返回 `Err(LimiterError::Cancelled)`。
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), LimiterError>;
}
