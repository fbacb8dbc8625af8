//! 积分余额与提现处理器

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bad_json;
use crate::auth::Claims;
use crate::error::Result;
use crate::models::{UserBalance, Withdrawal};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceDto {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

impl From<UserBalance> for BalanceDto {
    fn from(balance: UserBalance) -> Self {
        Self {
            current: balance.current,
            withdrawn: balance.withdrawn,
        }
    }
}

/// 提现请求
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalDto {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalDto {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            order: withdrawal.order_number,
            sum: withdrawal.amount,
            processed_at: withdrawal.processed_at,
        }
    }
}

/// GET /api/user/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<BalanceDto>> {
    let balance = state.ledger.balance(claims.sub).await?;
    Ok(Json(balance.into()))
}

/// 提现
///
/// POST /api/user/balance/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: std::result::Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(req) = body.map_err(bad_json)?;
    state
        .ledger
        .withdraw(claims.sub, req.order.trim(), req.sum)
        .await?;
    Ok(StatusCode::OK)
}

/// 列出提现记录，为空时返回 204
///
/// GET /api/user/withdrawals
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let withdrawals = state.ledger.withdrawals(claims.sub).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<WithdrawalDto> = withdrawals.into_iter().map(WithdrawalDto::from).collect();
    Ok(Json(body).into_response())
}
