//! 应用状态定义
//!
//! Axum 路由共享的服务实例

use std::sync::Arc;

use gophermart_shared::config::AuthConfig;
use gophermart_shared::database::Database;

use crate::auth::JwtManager;
use crate::repository::{
    MemoryStorage, OrderRepository, OrderRepositoryTrait, PgStorage, Storage, UserRepository,
    UserRepositoryTrait,
};
use crate::service::{AuthService, LedgerService, OrderService};

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub ledger: Arc<LedgerService>,
    pub auth: Arc<AuthService>,
    pub jwt_manager: JwtManager,
    /// 就绪检查使用；内存存储时为 None
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        orders: Arc<dyn OrderRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        config: &AuthConfig,
    ) -> Self {
        let jwt_manager = JwtManager::new(config);
        Self {
            orders: Arc::new(OrderService::new(orders)),
            ledger: Arc::new(LedgerService::new(storage)),
            auth: Arc::new(AuthService::new(
                users,
                jwt_manager.clone(),
                config.bcrypt_cost,
            )),
            jwt_manager,
            database: None,
        }
    }

    /// 基于 PostgreSQL 的应用状态
    pub fn with_database(database: Database, config: &AuthConfig) -> Self {
        let pool = database.pool().clone();
        let mut state = Self::new(
            Arc::new(PgStorage::new(pool.clone())),
            Arc::new(OrderRepository::new(pool.clone())),
            Arc::new(UserRepository::new(pool)),
            config,
        );
        state.database = Some(database);
        state
    }

    /// 基于内存存储的应用状态
    pub fn with_memory(storage: MemoryStorage, config: &AuthConfig) -> Self {
        Self::new(
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            Arc::new(storage),
            config,
        )
    }
}
