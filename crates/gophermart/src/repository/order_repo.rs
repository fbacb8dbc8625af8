//! 订单仓储
//!
//! 订单号全局唯一，先登记者胜出；重复登记由服务层判断归属

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::OrderRepositoryTrait;
use crate::error::Result;
use crate::models::Order;

/// 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn create_order(&self, user_id: i64, number: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, number, status, accrual)
            VALUES ($1, $2, 'NEW', 0)
            ON CONFLICT (number) DO NOTHING
            RETURNING id, user_id, number, status, accrual, uploaded_at
            "#,
        )
        .bind(user_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_order_by_number(&self, number: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, number, status, accrual, uploaded_at
            FROM orders
            WHERE number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, number, status, accrual, uploaded_at
            FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}
