//! 内存存储
//!
//! 与 PostgreSQL 实现满足同一组接口，所有操作在一把锁内完成，
//! 用于流水线测试和本地无数据库运行。支持故障注入。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::traits::{OrderRepositoryTrait, Storage, UserRepositoryTrait};
use crate::error::{LoyaltyError, Result};
use crate::models::{Order, OrderStatus, User, UserBalance, Withdrawal};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    orders: Vec<Order>,
    withdrawals: Vec<Withdrawal>,
    /// 每次成功回写的订单快照
    updates: Vec<Order>,
    /// 每轮扫描返回的订单号
    discoveries: Vec<Vec<String>>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn balance(&self, user_id: i64) -> UserBalance {
        let accrued: Decimal = self
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Processed)
            .map(|o| o.accrual)
            .sum();
        let withdrawn: Decimal = self
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.amount)
            .sum();
        UserBalance::from_ledger(accrued, withdrawn)
    }
}

#[derive(Default)]
struct Faults {
    discovery: AtomicUsize,
    update: AtomicUsize,
}

/// 从计数器中消费一次故障
fn take_fault(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected_failure() -> LoyaltyError {
    LoyaltyError::Database(sqlx::Error::PoolTimedOut)
}

/// 内存存储
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
    faults: Arc<Faults>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来的 n 次待处理订单查询失败
    pub fn fail_next_discoveries(&self, n: usize) {
        self.faults.discovery.store(n, Ordering::SeqCst);
    }

    /// 让接下来的 n 次订单回写失败
    pub fn fail_next_updates(&self, n: usize) {
        self.faults.update.store(n, Ordering::SeqCst);
    }

    /// 按订单号读取当前订单
    pub fn order(&self, number: &str) -> Option<Order> {
        self.inner
            .lock()
            .orders
            .iter()
            .find(|o| o.number == number)
            .cloned()
    }

    /// 全部订单快照
    pub fn orders(&self) -> Vec<Order> {
        self.inner.lock().orders.clone()
    }

    /// 成功回写的历史
    pub fn update_history(&self) -> Vec<Order> {
        self.inner.lock().updates.clone()
    }

    /// 每轮扫描返回的订单号
    pub fn discoveries(&self) -> Vec<Vec<String>> {
        self.inner.lock().discoveries.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_unprocessed_orders(&self) -> Result<Vec<Order>> {
        if take_fault(&self.faults.discovery) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock();
        let pending: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect();
        inner
            .discoveries
            .push(pending.iter().map(|o| o.number.clone()).collect());
        Ok(pending)
    }

    async fn update_order(&self, order: &Order) -> Result<bool> {
        if take_fault(&self.faults.update) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock();
        let Some(stored) = inner.orders.iter_mut().find(|o| o.id == order.id) else {
            return Ok(false);
        };
        if stored.status.is_terminal() {
            return Ok(false);
        }
        stored.status = order.status;
        stored.accrual = order.accrual;
        let snapshot = stored.clone();
        inner.updates.push(snapshot);
        Ok(true)
    }

    async fn get_user_balance(&self, user_id: i64) -> Result<UserBalance> {
        Ok(self.inner.lock().balance(user_id))
    }

    async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        let mut inner = self.inner.lock();

        if !inner.users.iter().any(|u| u.id == user_id) {
            return Err(LoyaltyError::UserNotFound(user_id.to_string()));
        }

        let balance = inner.balance(user_id);
        if amount > balance.current {
            return Err(LoyaltyError::InsufficientFunds {
                required: amount,
                available: balance.current,
            });
        }

        if inner.withdrawals.iter().any(|w| w.order_number == order_number) {
            return Err(LoyaltyError::DuplicateWithdrawal(order_number.to_string()));
        }

        let withdrawal = Withdrawal {
            id: inner.next_id(),
            user_id,
            order_number: order_number.to_string(),
            amount,
            processed_at: Utc::now(),
        };
        inner.withdrawals.push(withdrawal.clone());
        Ok(withdrawal)
    }

    async fn get_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        Ok(self
            .inner
            .lock()
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderRepositoryTrait for MemoryStorage {
    async fn create_order(&self, user_id: i64, number: &str) -> Result<Option<Order>> {
        let mut inner = self.inner.lock();
        if inner.orders.iter().any(|o| o.number == number) {
            return Ok(None);
        }

        let order = Order {
            id: inner.next_id(),
            user_id,
            number: number.to_string(),
            status: OrderStatus::New,
            accrual: Decimal::ZERO,
            uploaded_at: Utc::now(),
        };
        inner.orders.push(order.clone());
        Ok(Some(order))
    }

    async fn get_order_by_number(&self, number: &str) -> Result<Option<Order>> {
        Ok(self.order(number))
    }

    async fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        Ok(self
            .inner
            .lock()
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStorage {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User> {
        let mut inner = self.inner.lock();
        if inner.users.iter().any(|u| u.login == login) {
            return Err(LoyaltyError::LoginTaken(login.to_string()));
        }

        let user = User {
            id: inner.next_id(),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .iter()
            .find(|u| u.login == login)
            .cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.inner.lock().users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn user_with_points(storage: &MemoryStorage, points: Decimal) -> i64 {
        let user = storage.create_user("alice", "hash").await.unwrap();
        let order = storage
            .create_order(user.id, "79927398713")
            .await
            .unwrap()
            .unwrap();
        let processed = order.transitioned(OrderStatus::Processed, points).unwrap();
        assert!(storage.update_order(&processed).await.unwrap());
        user.id
    }

    #[tokio::test]
    async fn test_terminal_orders_are_not_rewritten() {
        let storage = MemoryStorage::new();
        let user_id = user_with_points(&storage, dec!(10)).await;

        let mut regressed = storage.order("79927398713").unwrap();
        assert_eq!(regressed.user_id, user_id);
        regressed.status = OrderStatus::Processing;
        regressed.accrual = Decimal::ZERO;

        assert!(!storage.update_order(&regressed).await.unwrap());
        let stored = storage.order("79927398713").unwrap();
        assert_eq!(stored.status, OrderStatus::Processed);
        assert_eq!(stored.accrual, dec!(10));
        assert!(storage.get_unprocessed_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_and_withdrawal() {
        let storage = MemoryStorage::new();
        let user_id = user_with_points(&storage, dec!(100)).await;

        storage
            .create_withdrawal(user_id, "12345678903", dec!(60))
            .await
            .unwrap();

        let balance = storage.get_user_balance(user_id).await.unwrap();
        assert_eq!(balance.current, dec!(40));
        assert_eq!(balance.withdrawn, dec!(60));

        let err = storage
            .create_withdrawal(user_id, "2377225624", dec!(40.01))
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::InsufficientFunds { .. }));

        let err = storage
            .create_withdrawal(user_id, "12345678903", dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::DuplicateWithdrawal(_)));
        assert_eq!(storage.get_withdrawals(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fault_injection_is_consumed() {
        let storage = MemoryStorage::new();
        storage.fail_next_discoveries(1);
        assert!(storage.get_unprocessed_orders().await.is_err());
        assert!(storage.get_unprocessed_orders().await.is_ok());
        assert_eq!(storage.discoveries().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_order_and_login() {
        let storage = MemoryStorage::new();
        let user = storage.create_user("bob", "hash").await.unwrap();
        assert!(storage.create_order(user.id, "0").await.unwrap().is_some());
        assert!(storage.create_order(user.id, "0").await.unwrap().is_none());
        assert!(matches!(
            storage.create_user("bob", "other").await,
            Err(LoyaltyError::LoginTaken(_))
        ));
    }
}
