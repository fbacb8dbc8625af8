//! 服务层
//!
//! 协调仓储层实现订单登记、积分账户与用户认证业务。
//!
//! ## 模块结构
//!
//! - `order_service`: 订单登记与查询
//! - `ledger_service`: 积分余额与提现
//! - `auth_service`: 用户注册与登录

pub mod auth_service;
pub mod ledger_service;
pub mod order_service;

pub use auth_service::AuthService;
pub use ledger_service::LedgerService;
pub use order_service::{OrderService, SubmitOutcome};
