//! 订单模型
//!
//! 订单状态机：`NEW → PROCESSING → {PROCESSED | INVALID}`，
//! PROCESSED 与 INVALID 为终态，之后不再被对账流水线访问。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LoyaltyError, Result};

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// 状态迁移是否合法
    ///
    /// `PROCESSING → PROCESSING` 视为合法的空迁移；终态不可再迁移。
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::New, Self::New) => false,
            (Self::New | Self::Processing, _) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户登记的订单
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub number: String,
    pub status: OrderStatus,
    /// 仅 PROCESSED 时有意义，其余状态恒为 0
    pub accrual: Decimal,
    pub uploaded_at: DateTime<Utc>,
}

impl Order {
    /// 生成迁移到新状态后的订单
    ///
    /// 状态与积分作为一对字段同时变化；非 PROCESSED 状态下积分归零。
    /// 迁移不合法时返回 None。
    pub fn transitioned(&self, status: OrderStatus, accrual: Decimal) -> Option<Order> {
        if !self.status.can_transition_to(status) {
            return None;
        }
        let accrual = if status == OrderStatus::Processed {
            accrual
        } else {
            Decimal::ZERO
        };
        Some(Order {
            status,
            accrual,
            ..self.clone()
        })
    }
}

/// Luhn 校验
pub fn is_luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// 校验订单号：纯数字且通过 Luhn 校验
pub fn validate_order_number(number: &str) -> Result<()> {
    if is_luhn_valid(number) {
        Ok(())
    } else {
        Err(LoyaltyError::InvalidOrderNumber(number.to_string()))
    }
}
