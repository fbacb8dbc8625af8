//! 待处理订单扫描生产者
//!
//! 启动后立即扫描一次，之后按固定间隔扫描；冷却期间跳过节拍，冷却结束后立即扫描。
//! 向满队列推送时挂起，这是流水线唯一的反压手段。

use std::sync::Arc;

use gophermart_shared::observability::metrics;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::clock::Clock;
use super::cooldown::CooldownGate;
use super::error::PipelineError;
use super::error_sink::ErrorReporter;
use super::schedule::RetrySchedule;
use super::tracker::DispatchTracker;
use crate::models::Order;
use crate::repository::Storage;

/// 扫描生产者
pub struct DiscoveryProducer {
    storage: Arc<dyn Storage>,
    queue: mpsc::Sender<Order>,
    tracker: Arc<DispatchTracker>,
    gate: Arc<CooldownGate>,
    schedule: RetrySchedule,
    clock: Arc<dyn Clock>,
    errors: ErrorReporter,
}

impl DiscoveryProducer {
    pub fn new(
        storage: Arc<dyn Storage>,
        queue: mpsc::Sender<Order>,
        tracker: Arc<DispatchTracker>,
        gate: Arc<CooldownGate>,
        schedule: RetrySchedule,
        clock: Arc<dyn Clock>,
        errors: ErrorReporter,
    ) -> Self {
        Self {
            storage,
            queue,
            tracker,
            gate,
            schedule,
            clock,
            errors,
        }
    }

    /// 主循环：直到收到关闭信号
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval = ?self.schedule.poll_interval,
            "扫描生产者已启动"
        );

        let mut next_wake = self.clock.now();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = self.clock.sleep_until(next_wake) => {}
            }

            if let Some(until) = self.gate.deadline_if_active() {
                debug!("冷却中，跳过本轮扫描");
                next_wake = until;
                continue;
            }

            let started = self.clock.now();
            if !self.discover(&mut shutdown).await {
                break;
            }

            let tick = self.schedule.next_tick(started).max(self.clock.now());
            next_wake = self
                .schedule
                .next_wake(tick, self.gate.deadline_if_active());
        }

        info!("扫描生产者已退出");
    }

    /// 执行一轮扫描，收到关闭信号或队列关闭时返回 false
    async fn discover(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        self.tracker.begin_cycle();

        let orders = match self.storage.get_unprocessed_orders().await {
            Ok(orders) => orders,
            Err(source) => {
                self.errors.report(PipelineError::Discovery { source });
                return true;
            }
        };

        metrics::set_discovered_orders(orders.len());
        if !orders.is_empty() {
            info!(count = orders.len(), "发现待处理订单");
        }

        for order in orders {
            let order_id = order.id;
            if !self.tracker.try_claim(order_id) {
                debug!(order = %order.number, "订单已在处理中，跳过");
                continue;
            }

            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => {
                    self.tracker.abandon(order_id);
                    return false;
                }
                sent = self.queue.send(order) => {
                    if sent.is_err() {
                        self.tracker.abandon(order_id);
                        return false;
                    }
                }
            }
        }

        true
    }
}
