use thiserror::Error;

/// # Summary
/// 限流器错误。等待令牌只会因取消而失败。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    /// 等待期间收到取消信号，未消耗令牌
    #[error("rate limiter wait cancelled")]
    Cancelled,
}
