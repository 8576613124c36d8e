use axum::Json;

use crate::types::{ApiResponse, HealthResponse};

/// 健康检查
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "服务正常", body = ApiResponse<HealthResponse>)
    )
)]
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
