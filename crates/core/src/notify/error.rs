use crate::limiter::error::LimiterError;
use thiserror::Error;

/// # Summary
/// 推送通道返回的投递错误，由通道适配器负责分类。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 核心逻辑只依赖分类结果，不解析平台返回的错误文本。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// 订阅者已屏蔽机器人或账号已注销，不可恢复
    #[error("Permanently blocked: {0}")]
    PermanentBlock(String),

    /// 网络、限流或平台临时错误
    #[error("Transient delivery failure: {0}")]
    Transient(String),
}

impl DeliveryError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::PermanentBlock(_))
    }
}

/// # Summary
/// 一次经由限流器的发送操作可能产生的错误。
///
/// # Invariants
/// - 取消与投递失败必须可区分。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// 等待令牌期间被取消，请求未到达推送通道
    #[error("Send cancelled: {0}")]
    Cancelled(#[from] LimiterError),

    /// 推送通道返回失败
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
