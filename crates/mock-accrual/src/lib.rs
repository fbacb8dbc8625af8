//! Mock 积分服务
//!
//! 模拟外部积分结算服务 `GET /api/orders/{number}`，用于开发和测试环境。
//!
//! # 主要模块
//!
//! - `script`: 每个订单的脚本化响应序列
//! - `store`: 脚本与调用计数的内存存储
//! - `limiter`: 每分钟请求数限制
//! - `server`: HTTP 路由与可嵌入测试的服务实例
//! - `cli`: 命令行参数
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use mock_accrual::script::ScriptedResponse;
//! use mock_accrual::server::{MockAccrualServer, ServerSettings};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let server = MockAccrualServer::spawn(ServerSettings::default()).await?;
//! server.store().script(
//!     "79927398713",
//!     vec![ScriptedResponse::RateLimited { retry_after: Some(10) }, ScriptedResponse::Processed { accrual: 500.0 }],
//! );
//! println!("{}", server.base_url());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod limiter;
pub mod script;
pub mod server;
pub mod store;
