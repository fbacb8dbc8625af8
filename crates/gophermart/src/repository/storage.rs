//! PostgreSQL 存储实现
//!
//! 提现在单个事务内完成：先以 `FOR UPDATE` 锁定用户行，串行化同一用户的并发提现，
//! 再基于账本重新计算余额并写入提现记录。

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument, warn};

use super::is_unique_violation;
use super::traits::Storage;
use crate::error::{LoyaltyError, Result};
use crate::models::{Order, UserBalance, Withdrawal};

/// 提现订单号唯一约束名
const WITHDRAWAL_ORDER_KEY: &str = "withdrawals_order_number_key";

/// PostgreSQL 存储
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 锁定用户行，返回用户是否存在
    async fn lock_user_in_tx(conn: &mut PgConnection, user_id: i64) -> Result<bool> {
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
        Ok(locked.is_some())
    }

    /// 基于账本计算余额
    ///
    /// 两个合计分别用标量子查询求出，避免连接后重复计数
    async fn balance_in_conn(conn: &mut PgConnection, user_id: i64) -> Result<UserBalance> {
        let (accrued, withdrawn): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE((SELECT SUM(accrual) FROM orders
                          WHERE user_id = $1 AND status = 'PROCESSED'), 0) AS accrued,
                COALESCE((SELECT SUM(amount) FROM withdrawals
                          WHERE user_id = $1), 0) AS withdrawn
            "#,
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(UserBalance::from_ledger(accrued, withdrawn))
    }

    /// 在事务中写入提现记录
    async fn insert_withdrawal_in_tx(
        conn: &mut PgConnection,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (user_id, order_number, amount)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, order_number, amount, processed_at
            "#,
        )
        .bind(user_id)
        .bind(order_number)
        .bind(amount)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, WITHDRAWAL_ORDER_KEY) {
                LoyaltyError::DuplicateWithdrawal(order_number.to_string())
            } else {
                LoyaltyError::Database(e)
            }
        })
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_unprocessed_orders(&self) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, number, status, accrual, uploaded_at
            FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY uploaded_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn update_order(&self, order: &Order) -> Result<bool> {
        // 单条语句同时写状态和积分，且只允许修改非终态订单
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3
            WHERE id = $1 AND status IN ('NEW', 'PROCESSING')
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.accrual)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() > 0;
        if !applied {
            debug!(order = %order.number, "订单已处于终态，忽略回写");
        }
        Ok(applied)
    }

    async fn get_user_balance(&self, user_id: i64) -> Result<UserBalance> {
        let mut conn = self.pool.acquire().await?;
        Self::balance_in_conn(&mut conn, user_id).await
    }

    #[instrument(skip(self))]
    async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        let mut tx = self.pool.begin().await?;

        if !Self::lock_user_in_tx(&mut tx, user_id).await? {
            return Err(LoyaltyError::UserNotFound(user_id.to_string()));
        }

        let balance = Self::balance_in_conn(&mut tx, user_id).await?;
        if amount > balance.current {
            // 事务随 tx 丢弃回滚
            warn!(%amount, available = %balance.current, "积分余额不足，拒绝提现");
            return Err(LoyaltyError::InsufficientFunds {
                required: amount,
                available: balance.current,
            });
        }

        let withdrawal = Self::insert_withdrawal_in_tx(&mut tx, user_id, order_number, amount).await?;
        tx.commit().await?;

        info!(%amount, "提现成功");
        Ok(withdrawal)
    }

    async fn get_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT id, user_id, order_number, amount, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(withdrawals)
    }
}
