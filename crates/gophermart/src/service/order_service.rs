//! 订单登记服务
//!
//! 订单号全局唯一：同一用户重复提交视为幂等成功，其他用户已登记则冲突。

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{LoyaltyError, Result};
use crate::models::{Order, validate_order_number};
use crate::repository::OrderRepositoryTrait;

/// 登记结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 新登记，等待对账
    Accepted(Order),
    /// 调用方此前已登记过
    AlreadyUploaded(Order),
}

impl SubmitOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::Accepted(order) | Self::AlreadyUploaded(order) => order,
        }
    }
}

/// 订单登记服务
pub struct OrderService {
    orders: Arc<dyn OrderRepositoryTrait>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self { orders }
    }

    /// 登记订单号
    #[instrument(skip(self))]
    pub async fn submit_order(&self, user_id: i64, number: &str) -> Result<SubmitOutcome> {
        validate_order_number(number)?;

        if let Some(order) = self.orders.create_order(user_id, number).await? {
            info!(order = %order.number, "订单已登记");
            return Ok(SubmitOutcome::Accepted(order));
        }

        // 唯一约束冲突：区分本人重复提交与他人占用
        let existing = self
            .orders
            .get_order_by_number(number)
            .await?
            .ok_or_else(|| LoyaltyError::Internal(format!("订单 {} 冲突后未找到", number)))?;

        if existing.user_id == user_id {
            Ok(SubmitOutcome::AlreadyUploaded(existing))
        } else {
            Err(LoyaltyError::OrderOwnedByAnotherUser(number.to_string()))
        }
    }

    /// 按登记时间正序列出用户订单
    pub async fn list_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        self.orders.list_user_orders(user_id).await
    }
}
