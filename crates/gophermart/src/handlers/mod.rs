//! HTTP 请求处理器模块

pub mod auth;
pub mod balance;
pub mod health;
pub mod orders;

use axum::extract::rejection::JsonRejection;

use crate::error::LoyaltyError;

/// 请求体无法解析时统一按参数错误处理
pub(crate) fn bad_json(rejection: JsonRejection) -> LoyaltyError {
    LoyaltyError::Validation(rejection.body_text())
}
