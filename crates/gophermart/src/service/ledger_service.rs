//! 积分账户服务
//!
//! 余额每次重新计算；提现的余额校验与写入由存储层在同一事务内完成，
//! 同一用户的并发提现不会透支。

use std::sync::Arc;

use gophermart_shared::observability::metrics;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::error::{LoyaltyError, Result};
use crate::models::{UserBalance, Withdrawal, validate_order_number};
use crate::repository::Storage;

const MONEY_SCALE: u32 = 2;

/// 积分账户服务
pub struct LedgerService {
    storage: Arc<dyn Storage>,
}

impl LedgerService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn balance(&self, user_id: i64) -> Result<UserBalance> {
        self.storage.get_user_balance(user_id).await
    }

    /// 提现
    #[instrument(skip(self))]
    pub async fn withdraw(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        // 金额精确到分，与存储列的精度一致
        if amount <= Decimal::ZERO || amount != amount.round_dp(MONEY_SCALE) {
            return Err(LoyaltyError::InvalidAmount(amount));
        }
        validate_order_number(order_number)?;

        let result = self
            .storage
            .create_withdrawal(user_id, order_number, amount)
            .await;

        let label = match &result {
            Ok(_) => "success",
            Err(LoyaltyError::InsufficientFunds { .. }) => "insufficient_funds",
            Err(LoyaltyError::DuplicateWithdrawal(_)) => "duplicate",
            Err(_) => "error",
        };
        metrics::record_withdrawal(label);

        let withdrawal = result?;
        info!(order = %withdrawal.order_number, amount = %withdrawal.amount, "提现成功");
        Ok(withdrawal)
    }

    /// 按处理时间正序列出提现记录
    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        self.storage.get_withdrawals(user_id).await
    }
}
