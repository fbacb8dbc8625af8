//! 流水线组装
//!
//! 一个扫描生产者、若干回写消费者和一个错误观察者，共享存储、积分客户端、
//! 冷却闸门与派发跟踪；由同一个关闭信号统一停止。

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use gophermart_shared::config::AccrualConfig;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span, warn};

use super::client::ScoringService;
use super::clock::Clock;
use super::consumer::UpdateConsumer;
use super::cooldown::CooldownGate;
use super::error::PipelineError;
use super::error_sink::{ErrorReporter, ErrorSink, SinkStats, error_channel};
use super::producer::DiscoveryProducer;
use super::schedule::RetrySchedule;
use super::tracker::DispatchTracker;
use crate::repository::Storage;

/// 流水线参数
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub queue_capacity: usize,
    pub workers: usize,
    pub error_buffer: usize,
    pub schedule: RetrySchedule,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 5,
            workers: 1,
            error_buffer: 64,
            schedule: RetrySchedule::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AccrualConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            workers: config.workers,
            error_buffer: config.error_buffer,
            schedule: RetrySchedule::from_config(config),
        }
    }
}

/// 积分对账流水线
pub struct AccrualPipeline {
    settings: PipelineSettings,
    storage: Arc<dyn Storage>,
    scoring: Arc<dyn ScoringService>,
    clock: Arc<dyn Clock>,
    gate: Arc<CooldownGate>,
    tracker: Arc<DispatchTracker>,
    reporter: ErrorReporter,
    sink: ErrorSink,
}

impl AccrualPipeline {
    pub fn new(
        settings: PipelineSettings,
        storage: Arc<dyn Storage>,
        scoring: Arc<dyn ScoringService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (reporter, sink) = error_channel(settings.error_buffer);
        Self {
            gate: Arc::new(CooldownGate::new(clock.clone())),
            tracker: Arc::new(DispatchTracker::new()),
            settings,
            storage,
            scoring,
            clock,
            reporter,
            sink,
        }
    }

    /// 订阅错误流（除错误观察者之外的额外订阅者）
    pub fn subscribe_errors(&self) -> broadcast::Receiver<Arc<PipelineError>> {
        self.reporter.subscribe()
    }

    /// 共享冷却闸门
    pub fn cooldown_gate(&self) -> Arc<CooldownGate> {
        self.gate.clone()
    }

    /// 启动全部任务
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> PipelineHandle {
        let Self {
            settings,
            storage,
            scoring,
            clock,
            gate,
            tracker,
            reporter,
            sink,
        } = self;

        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        let sink = tokio::spawn(sink.run().instrument(info_span!("accrual_error_sink")));

        let consumers = (0..settings.workers.max(1))
            .map(|worker_id| {
                let consumer = UpdateConsumer::new(
                    worker_id,
                    storage.clone(),
                    scoring.clone(),
                    queue.clone(),
                    tracker.clone(),
                    gate.clone(),
                    reporter.clone(),
                );
                tokio::spawn(
                    consumer
                        .run(shutdown.clone())
                        .instrument(info_span!("accrual_consumer", worker = worker_id)),
                )
            })
            .collect();

        let producer = DiscoveryProducer::new(
            storage,
            tx,
            tracker,
            gate,
            settings.schedule,
            clock,
            reporter,
        );
        let producer = tokio::spawn(
            producer
                .run(shutdown)
                .instrument(info_span!("accrual_producer")),
        );

        info!(
            workers = settings.workers,
            queue_capacity = settings.queue_capacity,
            "积分对账流水线已启动"
        );

        PipelineHandle {
            producer,
            consumers,
            sink,
        }
    }
}

/// 流水线任务句柄
pub struct PipelineHandle {
    producer: JoinHandle<()>,
    consumers: Vec<JoinHandle<()>>,
    sink: JoinHandle<SinkStats>,
}

impl PipelineHandle {
    /// 等待全部任务退出，超时后强制中止
    ///
    /// 需在发出关闭信号之后调用；正常退出时返回错误观察者的统计
    pub async fn join(self, timeout: Duration) -> Option<SinkStats> {
        let mut aborts = vec![self.producer.abort_handle(), self.sink.abort_handle()];
        aborts.extend(self.consumers.iter().map(|c| c.abort_handle()));

        let producer = self.producer;
        let consumers = self.consumers;
        let sink = self.sink;
        let all = async move {
            let _ = producer.await;
            join_all(consumers).await;
            // 上报端全部释放后观察者排空剩余错误并退出
            sink.await.ok()
        };

        match tokio::time::timeout(timeout, all).await {
            Ok(stats) => {
                info!("积分对账流水线已停止");
                stats
            }
            Err(_) => {
                warn!(timeout = ?timeout, "流水线未在关闭窗口内退出，强制中止");
                for handle in aborts {
                    handle.abort();
                }
                None
            }
        }
    }
}
