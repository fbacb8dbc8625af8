//! 认证模块
//!
//! 用户令牌签发与校验，以及密码哈希

mod jwt;
mod password;

pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};
