//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Order, User, UserBalance, Withdrawal};

/// 存储能力：对账流水线和积分账户守卫只依赖这五个操作
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// 查询所有处于 NEW / PROCESSING 的订单
    async fn get_unprocessed_orders(&self) -> Result<Vec<Order>>;

    /// 原子地回写订单状态与积分
    ///
    /// 订单已处于终态时不做修改并返回 false
    async fn update_order(&self, order: &Order) -> Result<bool>;

    /// 重新计算用户余额
    async fn get_user_balance(&self, user_id: i64) -> Result<UserBalance>;

    /// 原子地校验余额并写入提现记录
    ///
    /// 余额不足返回 `InsufficientFunds`，不写入任何记录
    async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal>;

    /// 按时间正序列出用户的提现记录
    async fn get_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>>;
}

/// 订单登记仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 创建 NEW 状态的订单；订单号已存在时返回 None
    async fn create_order(&self, user_id: i64, number: &str) -> Result<Option<Order>>;
    async fn get_order_by_number(&self, number: &str) -> Result<Option<Order>>;
    /// 按登记时间正序列出用户订单
    async fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// 创建用户；用户名已存在时返回 `LoginTaken`
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User>;
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
}
