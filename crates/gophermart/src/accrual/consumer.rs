//! 订单状态回写消费者
//!
//! 从队列逐个取出订单，冷却结束后查询外部服务，只有确定结果才回写存储。
//! 外部调用可被关闭信号中断；存储回写一旦开始不会被中断，保证状态与积分成对落库。

use std::sync::Arc;

use gophermart_shared::observability::metrics;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

use super::client::{ScoringOutcome, ScoringService};
use super::cooldown::CooldownGate;
use super::error::{AccrualError, PipelineError};
use super::error_sink::ErrorReporter;
use super::tracker::DispatchTracker;
use crate::models::Order;
use crate::repository::Storage;

/// 多个消费者共享的队列接收端
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<Order>>>;

/// 回写消费者
pub struct UpdateConsumer {
    worker_id: usize,
    storage: Arc<dyn Storage>,
    scoring: Arc<dyn ScoringService>,
    queue: SharedQueue,
    tracker: Arc<DispatchTracker>,
    gate: Arc<CooldownGate>,
    errors: ErrorReporter,
}

impl UpdateConsumer {
    pub fn new(
        worker_id: usize,
        storage: Arc<dyn Storage>,
        scoring: Arc<dyn ScoringService>,
        queue: SharedQueue,
        tracker: Arc<DispatchTracker>,
        gate: Arc<CooldownGate>,
        errors: ErrorReporter,
    ) -> Self {
        Self {
            worker_id,
            storage,
            scoring,
            queue,
            tracker,
            gate,
            errors,
        }
    }

    /// 主循环：每次取任务前先检查关闭信号
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(worker = self.worker_id, "回写消费者已启动");

        loop {
            let order = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                next = Self::next_order(&self.queue) => match next {
                    Some(order) => order,
                    None => break,
                },
            };

            if !self.gate.wait_until_clear(&mut shutdown).await {
                self.tracker.abandon(order.id);
                break;
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!(order = %order.number, "关闭中，中断外部调用");
                    self.tracker.abandon(order.id);
                    break;
                }
                outcome = self.scoring.score(&order.number) => outcome,
            };

            self.handle_outcome(&order, outcome).await;
            self.tracker.release(order.id);
        }

        info!(worker = self.worker_id, "回写消费者已退出");
    }

    async fn next_order(queue: &SharedQueue) -> Option<Order> {
        queue.lock().await.recv().await
    }

    /// 处理单个订单的查询结果
    pub async fn handle_outcome(
        &self,
        order: &Order,
        outcome: Result<ScoringOutcome, AccrualError>,
    ) {
        match outcome {
            Ok(ScoringOutcome::Scored(result)) => {
                let Some(updated) = result.apply_to(order) else {
                    debug!(
                        order = %order.number,
                        from = %order.status,
                        to = ?result.status,
                        "状态迁移不合法，忽略"
                    );
                    return;
                };

                match self.storage.update_order(&updated).await {
                    Ok(true) => {
                        metrics::record_order_update(updated.status.as_str());
                        info!(
                            order = %updated.number,
                            status = %updated.status,
                            accrual = %updated.accrual,
                            "订单状态已更新"
                        );
                    }
                    Ok(false) => {
                        debug!(order = %updated.number, "订单已是终态，未回写");
                    }
                    Err(source) => self.errors.report(PipelineError::Update {
                        order_number: order.number.clone(),
                        source,
                    }),
                }
            }
            Ok(ScoringOutcome::Unknown) => {
                debug!(order = %order.number, "积分服务尚未登记该订单");
            }
            Ok(ScoringOutcome::RateLimited { cooldown }) => {
                warn!(order = %order.number, ?cooldown, "积分服务限流");
                self.gate.trigger(cooldown);
            }
            Err(source) => self.errors.report(PipelineError::Scoring {
                order_number: order.number.clone(),
                source,
            }),
        }
    }
}
