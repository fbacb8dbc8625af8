//! 积分服务领域模型

pub mod balance;
pub mod order;
pub mod user;

pub use balance::{UserBalance, Withdrawal};
pub use order::{Order, OrderStatus, is_luhn_valid, validate_order_number};
pub use user::User;
