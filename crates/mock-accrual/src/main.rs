//! Mock 积分服务入口

use clap::Parser;
use mock_accrual::cli::Cli;
use mock_accrual::server::{MockAccrualState, router};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数指定的级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .init();

    let settings = cli.settings();
    let app = router(MockAccrualState::new(&settings));

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!(port = settings.port, max_rpm = ?settings.max_rpm, "Mock 积分服务已启动");

    axum::serve(listener, app).await?;
    Ok(())
}
