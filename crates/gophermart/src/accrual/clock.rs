//! 可注入时钟
//!
//! 流水线中所有定时行为（扫描间隔、冷却等待）都经由 `Clock`，
//! 测试可以用 `ManualClock` 手动推进时间，或在暂停的 tokio 时间下使用 `TokioClock`。

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

/// 时钟抽象
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// 睡眠到指定时刻，可被调用方通过 select 提前取消
    async fn sleep_until(&self, deadline: Instant);
}

/// 基于 tokio 定时器的时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

/// 手动推进的时钟
pub struct ManualClock {
    now: watch::Sender<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (now, _) = watch::channel(Instant::now());
        Self { now }
    }

    /// 推进时间并唤醒到期的睡眠者
    pub fn advance(&self, by: Duration) {
        self.now.send_modify(|now| *now += by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.borrow()
    }

    async fn sleep_until(&self, deadline: Instant) {
        let mut rx = self.now.subscribe();
        let _ = rx.wait_for(|now| *now >= deadline).await;
    }
}
