//! 积分结算对账流水线
//!
//! 扫描生产者周期性地把非终态订单推入有界队列，消费者逐个向外部积分服务查询，
//! 得到确定结果后回写存储。限流冷却通过共享截止时间在生产者和所有消费者间协调，
//! 运行期错误汇聚到独立的错误观察者，不反压任何一方。

pub mod client;
pub mod clock;
pub mod consumer;
pub mod cooldown;
pub mod error;
pub mod error_sink;
pub mod pipeline;
pub mod producer;
pub mod schedule;
pub mod tracker;

pub use client::{AccrualClient, ExternalStatus, ScoringOutcome, ScoringResult, ScoringService};
pub use clock::{Clock, ManualClock, TokioClock};
pub use consumer::UpdateConsumer;
pub use cooldown::CooldownGate;
pub use error::{AccrualError, PipelineError};
pub use error_sink::{ErrorReporter, ErrorSink, SinkStats, error_channel};
pub use pipeline::{AccrualPipeline, PipelineHandle, PipelineSettings};
pub use producer::DiscoveryProducer;
pub use schedule::RetrySchedule;
pub use tracker::DispatchTracker;

#[cfg(test)]
pub use client::MockScoringService;
