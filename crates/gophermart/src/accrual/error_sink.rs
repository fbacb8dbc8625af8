//! 错误汇聚
//!
//! 生产者和消费者通过 `ErrorReporter` 上报运行期错误，发送永不阻塞；
//! 通道容量有限，观察者跟不上时丢弃最旧的错误并计数。
//! 所有上报端释放后，观察者处理完剩余错误即退出。

use std::sync::Arc;

use gophermart_shared::observability::metrics;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

use super::error::PipelineError;

/// 错误上报端
#[derive(Clone)]
pub struct ErrorReporter {
    tx: broadcast::Sender<Arc<PipelineError>>,
}

impl ErrorReporter {
    /// 上报错误，不等待观察者
    pub fn report(&self, err: PipelineError) {
        metrics::record_pipeline_error(err.stage());
        // 没有观察者时直接丢弃
        let _ = self.tx.send(Arc::new(err));
    }

    /// 额外订阅错误流
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineError>> {
        self.tx.subscribe()
    }
}

/// 观察者运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub reported: u64,
    pub dropped: u64,
}

/// 错误观察者
pub struct ErrorSink {
    rx: broadcast::Receiver<Arc<PipelineError>>,
}

/// 创建上报端与观察者
pub fn error_channel(capacity: usize) -> (ErrorReporter, ErrorSink) {
    let (tx, rx) = broadcast::channel(capacity.max(1));
    (ErrorReporter { tx }, ErrorSink { rx })
}

impl ErrorSink {
    /// 持续记录错误直到所有上报端关闭
    pub async fn run(mut self) -> SinkStats {
        let mut stats = SinkStats::default();

        loop {
            match self.rx.recv().await {
                Ok(err) => {
                    stats.reported += 1;
                    error!(
                        stage = err.stage(),
                        order = err.order_number().unwrap_or("-"),
                        error = %err,
                        "积分对账流水线错误"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    stats.dropped += skipped;
                    metrics::record_pipeline_errors_dropped(skipped);
                    warn!(skipped, "错误观察者积压，已丢弃最旧的错误");
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!(
            reported = stats.reported,
            dropped = stats.dropped,
            "错误观察者已退出"
        );
        stats
    }
}
