use thiserror::Error;

/// # Summary
/// 指令来源 (如长轮询) 的错误枚举。
#[derive(Error, Debug)]
pub enum SourceError {
    /// 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 平台返回的错误
    #[error("Platform error: {0}")]
    Platform(String),
}
