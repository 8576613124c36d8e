//! # 订阅者查询路由控制器

use axum::Json;
use axum::extract::{Query, State};
use slotbot_core::common::FilterTag;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, SubscriberCountResponse, SubscriberQuery};

/// 统计会收到某类别广播的启用订阅者数量
#[utoipa::path(
    get,
    path = "/api/v1/subscribers",
    tag = "订阅者 (Subscriber)",
    params(SubscriberQuery),
    responses(
        (status = 200, description = "成功获取数量", body = ApiResponse<SubscriberCountResponse>),
        (status = 400, description = "类别无法识别")
    )
)]
pub async fn count_subscribers(
    State(state): State<AppState>,
    Query(query): Query<SubscriberQuery>,
) -> Result<Json<ApiResponse<SubscriberCountResponse>>, ApiError> {
    let category = FilterTag::parse_optional(query.category.as_deref().unwrap_or_default())
        .map_err(ApiError::BadRequest)?;
    let count = state.store.list(category).await?.len();

    Ok(Json(ApiResponse::ok(SubscriberCountResponse {
        category,
        count,
    })))
}
