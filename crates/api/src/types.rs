//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向调用方 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use serde::{Deserialize, Serialize};
use slotbot_core::common::FilterTag;
use slotbot_dispatch::broadcaster::BroadcastReport;
use utoipa::{IntoParams, ToSchema};

// ============================================================
//  广播相关 DTO
// ============================================================

/// 广播触发请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotifyRequest {
    /// 放号所属类别
    #[schema(example = "AstraZeneca")]
    pub category: FilterTag,
    /// 推送给订阅者的正文
    #[schema(example = "New AstraZeneca slots available at Centre de vaccination Paris 15")]
    pub message: String,
}

/// 广播结果 DTO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BroadcastReportResponse {
    /// 匹配的订阅者数
    #[schema(example = 120)]
    pub recipients: usize,
    /// 成功投递数
    pub delivered: usize,
    /// 因屏蔽被移除的订阅者数
    pub pruned: usize,
    /// 其他失败数
    pub failed: usize,
    /// 因关闭未发出的数量
    pub cancelled: usize,
}

impl From<BroadcastReport> for BroadcastReportResponse {
    fn from(report: BroadcastReport) -> Self {
        Self {
            recipients: report.recipients,
            delivered: report.delivered,
            pruned: report.pruned,
            failed: report.failed,
            cancelled: report.cancelled,
        }
    }
}

// ============================================================
//  订阅者相关 DTO
// ============================================================

/// 订阅者数量查询参数
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscriberQuery {
    /// 类别；为空表示全部启用的订阅者
    pub category: Option<String>,
}

/// 订阅者数量 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriberCountResponse {
    /// 查询的类别 (为空表示全部)
    pub category: Option<FilterTag>,
    /// 会收到该类别广播的启用订阅者数
    #[schema(example = 42)]
    pub count: usize,
}

// ============================================================
//  系统 DTO
// ============================================================

/// 健康检查 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
