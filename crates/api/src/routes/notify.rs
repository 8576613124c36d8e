//! # 广播触发路由控制器
//!
//! 实现 `/api/v1/notify` 路径：外部检测程序发现放号后调用此接口，
//! 请求在全部投递结束后才返回。

use axum::Json;
use axum::extract::State;
use slotbot_core::common::NotificationResult;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, BroadcastReportResponse, NotifyRequest};

/// 向匹配类别的订阅者广播一条放号通知
///
/// 查询订阅者失败时返回 500 且不会发送任何消息；
/// 单个订阅者的投递失败只体现在统计中。
#[utoipa::path(
    post,
    path = "/api/v1/notify",
    tag = "广播 (Notify)",
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "广播完成", body = ApiResponse<BroadcastReportResponse>),
        (status = 422, description = "请求体无法解析"),
        (status = 500, description = "订阅者查询失败")
    )
)]
pub async fn notify(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<ApiResponse<BroadcastReportResponse>>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message 不能为空".into()));
    }

    let result = NotificationResult {
        category: req.category,
        message: req.message,
    };
    let report = state.broadcaster.notify(&result).await?;

    Ok(Json(ApiResponse::ok(report.into())))
}
