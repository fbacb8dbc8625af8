//! 仓储层
//!
//! `Storage` 是对账流水线与账户守卫依赖的存储能力，
//! 订单登记和用户注册使用独立的仓储接口。

pub mod memory;
pub mod order_repo;
pub mod storage;
pub mod traits;
pub mod user_repo;

pub use memory::MemoryStorage;
pub use order_repo::OrderRepository;
pub use storage::PgStorage;
pub use traits::{OrderRepositoryTrait, Storage, UserRepositoryTrait};
pub use user_repo::UserRepository;

#[cfg(test)]
pub use traits::{MockOrderRepositoryTrait, MockStorage, MockUserRepositoryTrait};

/// 是否为指定唯一约束的冲突
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation() && db.constraint() == Some(constraint),
        _ => false,
    }
}
