//! 订单登记与查询处理器

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::Claims;
use crate::error::{LoyaltyError, Result};
use crate::models::{Order, OrderStatus};
use crate::service::SubmitOutcome;
use crate::state::AppState;

/// 订单响应
#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub number: String,
    pub status: OrderStatus,
    /// 仅 PROCESSED 订单返回
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        Self {
            accrual: (order.status == OrderStatus::Processed).then_some(order.accrual),
            number: order.number,
            status: order.status,
            uploaded_at: order.uploaded_at,
        }
    }
}

/// 登记订单，请求体为纯文本订单号
///
/// POST /api/user/orders
pub async fn submit_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: String,
) -> Result<StatusCode> {
    let number = body.trim();
    if number.is_empty() {
        return Err(LoyaltyError::Validation("订单号不能为空".to_string()));
    }

    match state.orders.submit_order(claims.sub, number).await? {
        SubmitOutcome::Accepted(_) => Ok(StatusCode::ACCEPTED),
        SubmitOutcome::AlreadyUploaded(_) => Ok(StatusCode::OK),
    }
}

/// 列出当前用户的订单，为空时返回 204
///
/// GET /api/user/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let orders = state.orders.list_orders(claims.sub).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<OrderDto> = orders.into_iter().map(OrderDto::from).collect();
    Ok(Json(body).into_response())
}
