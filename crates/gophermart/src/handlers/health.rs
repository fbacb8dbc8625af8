//! 健康检查

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

/// 存活探针
///
/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 就绪探针，检查数据库连通性
///
/// GET /ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(database) = &state.database else {
        return (StatusCode::OK, Json(json!({ "status": "ready" })));
    };

    match database.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "就绪检查失败");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
