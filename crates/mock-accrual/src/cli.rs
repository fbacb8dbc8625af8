//! 命令行参数

use clap::Parser;

use crate::server::ServerSettings;

/// Mock 积分服务
#[derive(Parser, Debug)]
#[command(name = "mock-accrual")]
#[command(version, about = "模拟外部积分结算服务")]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// 服务端口
    #[arg(short, long, env = "MOCK_ACCRUAL_PORT", default_value = "8081")]
    pub port: u16,

    /// 每分钟请求上限，超出时返回 429
    #[arg(long, env = "MOCK_ACCRUAL_MAX_RPM")]
    pub max_rpm: Option<u32>,

    /// 429 响应的 Retry-After 秒数
    #[arg(long, default_value = "60")]
    pub retry_after: u64,
}

impl Cli {
    pub fn settings(&self) -> ServerSettings {
        ServerSettings {
            port: self.port,
            max_rpm: self.max_rpm,
            retry_after_secs: self.retry_after,
        }
    }
}
