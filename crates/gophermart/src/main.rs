//! 积分商城服务入口
//!
//! 启动 REST API 与积分对账流水线，收到 SIGINT / SIGTERM 后依次停止
//! HTTP 服务、对账流水线和数据库连接池。

use std::sync::Arc;

use gophermart::accrual::{AccrualClient, AccrualPipeline, PipelineSettings, TokioClock};
use gophermart::repository::PgStorage;
use gophermart::routes;
use gophermart::state::AppState;
use gophermart_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("gophermart")?;
    config.validate()?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting gophermart on {}", config.server_addr());

    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;

    // 对账流水线
    let scoring = AccrualClient::new(&config.accrual)?;
    info!(base_url = %scoring.base_url(), "积分服务地址");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline = AccrualPipeline::new(
        PipelineSettings::from_config(&config.accrual),
        Arc::new(PgStorage::new(db.pool().clone())),
        Arc::new(scoring),
        Arc::new(TokioClock),
    );
    let pipeline = pipeline.spawn(shutdown_rx);

    let state = AppState::with_database(db.clone(), &config.auth);
    let app = routes::build_router(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP 服务异常退出");
    }

    // HTTP 停止后再通知流水线，保证已接受的请求处理完毕
    let _ = shutdown_tx.send(true);
    match pipeline.join(config.accrual.shutdown_timeout()).await {
        Some(stats) => info!(
            reported = stats.reported,
            dropped = stats.dropped,
            "流水线错误统计"
        ),
        None => warn!("流水线未完整退出"),
    }

    db.close().await;
    info!("Server shutdown complete");

    served.map_err(Into::into)
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
