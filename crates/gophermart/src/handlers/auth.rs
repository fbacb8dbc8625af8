//! 注册与登录处理器
//!
//! 成功时通过 `Authorization: Bearer <token>` 响应头返回令牌

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use validator::Validate;

use super::bad_json;
use crate::error::Result;
use crate::state::AppState;

/// 注册 / 登录请求
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 64, message = "用户名长度必须在 1-64 之间"))]
    pub login: String,
    #[validate(length(min = 1, max = 128, message = "密码长度必须在 1-128 之间"))]
    pub password: String,
}

fn token_response(token: String) -> Response {
    (
        StatusCode::OK,
        [(AUTHORIZATION, format!("Bearer {}", token))],
    )
        .into_response()
}

/// 注册
///
/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = body.map_err(bad_json)?;
    req.validate()?;

    let token = state.auth.register(&req.login, &req.password).await?;
    Ok(token_response(token))
}

/// 登录
///
/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = body.map_err(bad_json)?;
    req.validate()?;

    let token = state.auth.login(&req.login, &req.password).await?;
    Ok(token_response(token))
}
