//! 积分商城核心服务
//!
//! 负责订单登记、积分结算对账流水线和积分账户余额/提现，
//! 通过 REST API 对外提供服务。

pub mod accrual;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{LoyaltyError, Result};
