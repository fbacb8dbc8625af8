//! PostgreSQL 连接池与 schema 迁移
//!
//! 迁移脚本位于仓库根目录的 migrations/，编译期嵌入；
//! 订单表的状态/积分约束与提现表的金额约束都在迁移中定义。

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};

/// 嵌入的迁移集合
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// 按配置构造连接池参数
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

/// 数据库连接池
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 建立连接池，连接失败属于启动期致命错误
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = pool_options(config);
        info!(
            max_connections = options.get_max_connections(),
            min_connections = options.get_min_connections(),
            acquire_timeout = ?options.get_acquire_timeout(),
            "连接 PostgreSQL"
        );

        let pool = options.connect(&config.url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 就绪检查
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(SharedError::from)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL 连接池已关闭");
    }

    /// 应用全部未执行的迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        let total = MIGRATOR.iter().count();
        MIGRATOR.run(&self.pool).await?;
        info!(migrations = total, "数据库迁移完成");
        Ok(())
    }
}
