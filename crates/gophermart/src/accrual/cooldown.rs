//! 限流冷却闸门
//!
//! 生产者和所有消费者共享同一个冷却截止时间：429 只会推迟截止时间，不会提前。
//! 冷却期间生产者跳过扫描，消费者暂停发起新的外部调用。

use std::sync::Arc;
use std::time::Duration;

use gophermart_shared::observability::metrics;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use super::clock::Clock;

/// 共享冷却截止时间
pub struct CooldownGate {
    clock: Arc<dyn Clock>,
    deadline: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            deadline: Mutex::new(None),
        }
    }

    /// 开始（或延长）冷却，返回生效的截止时间
    pub fn trigger(&self, cooldown: Duration) -> Instant {
        let candidate = self.clock.now() + cooldown;
        let mut deadline = self.deadline.lock();
        let effective = match *deadline {
            Some(current) if current >= candidate => current,
            _ => candidate,
        };
        *deadline = Some(effective);
        drop(deadline);

        metrics::record_accrual_cooldown(cooldown.as_secs_f64());
        info!(cooldown_secs = cooldown.as_secs_f64(), "积分服务限流，进入冷却");
        effective
    }

    /// 冷却仍在进行时返回截止时间
    pub fn deadline_if_active(&self) -> Option<Instant> {
        let deadline = (*self.deadline.lock())?;
        (deadline > self.clock.now()).then_some(deadline)
    }

    pub fn is_active(&self) -> bool {
        self.deadline_if_active().is_some()
    }

    /// 等待冷却结束
    ///
    /// 等待期间冷却被延长会继续等待；收到关闭信号时返回 false
    pub async fn wait_until_clear(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        while let Some(deadline) = self.deadline_if_active() {
            debug!("冷却中，暂停外部调用");
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => return false,
                _ = self.clock.sleep_until(deadline) => {}
            }
        }
        !*shutdown.borrow()
    }
}
