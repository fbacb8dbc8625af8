//! 集成测试公共工具

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gophermart::accrual::{
    AccrualError, AccrualPipeline, ExternalStatus, PipelineSettings, RetrySchedule,
    ScoringOutcome, ScoringResult, ScoringService, TokioClock,
};
use gophermart::repository::{MemoryStorage, OrderRepositoryTrait, UserRepositoryTrait};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::Instant;

/// 脚本中的一步
#[derive(Debug, Clone)]
pub enum Step {
    Outcome(ScoringOutcome),
    /// 返回 5xx 瞬时错误
    Fail(u16),
    /// 永不返回
    Hang,
}

pub fn processed(number: &str, accrual: Decimal) -> Step {
    Step::Outcome(ScoringOutcome::Scored(ScoringResult {
        order: number.to_string(),
        status: ExternalStatus::Processed,
        accrual: Some(accrual),
    }))
}

pub fn status(number: &str, status: ExternalStatus) -> Step {
    Step::Outcome(ScoringOutcome::Scored(ScoringResult {
        order: number.to_string(),
        status,
        accrual: None,
    }))
}

pub fn rate_limited(secs: u64) -> Step {
    Step::Outcome(ScoringOutcome::RateLimited {
        cooldown: Duration::from_secs(secs),
    })
}

pub fn unknown() -> Step {
    Step::Outcome(ScoringOutcome::Unknown)
}

/// 按订单脚本应答的积分服务，记录每次调用的时间
///
/// 脚本依次消费，最后一步保持不变；未设置脚本的订单视为未登记
#[derive(Default)]
pub struct ScriptedScoring {
    scripts: Mutex<HashMap<String, (Vec<Step>, usize)>>,
    calls: Mutex<Vec<(String, Instant)>>,
    delay: Duration,
}

impl ScriptedScoring {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用前先等待一段时间
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(self, number: &str, steps: Vec<Step>) -> Self {
        self.scripts.lock().insert(number.to_string(), (steps, 0));
        self
    }

    pub fn calls(&self, number: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(n, _)| n == number)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_step(&self, number: &str) -> Step {
        let mut scripts = self.scripts.lock();
        let Some((steps, cursor)) = scripts.get_mut(number) else {
            return unknown();
        };
        let Some(last) = steps.len().checked_sub(1) else {
            return unknown();
        };
        let step = steps[(*cursor).min(last)].clone();
        if *cursor < last {
            *cursor += 1;
        }
        step
    }
}

#[async_trait]
impl ScoringService for ScriptedScoring {
    async fn score(&self, order_number: &str) -> Result<ScoringOutcome, AccrualError> {
        self.calls
            .lock()
            .push((order_number.to_string(), Instant::now()));
        let step = self.next_step(order_number);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match step {
            Step::Outcome(outcome) => Ok(outcome),
            Step::Fail(status) => Err(AccrualError::Upstream { status }),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// 创建用户并登记一批订单，返回用户 ID
pub async fn seed_orders(storage: &MemoryStorage, login: &str, numbers: &[&str]) -> i64 {
    let user = storage.create_user(login, "hash").await.unwrap();
    for number in numbers {
        storage
            .create_order(user.id, number)
            .await
            .unwrap()
            .expect("order number must be fresh");
    }
    user.id
}

/// 默认参数：2 秒扫描间隔，10 秒冷却
pub fn settings(workers: usize, queue_capacity: usize) -> PipelineSettings {
    PipelineSettings {
        queue_capacity,
        workers,
        error_buffer: 16,
        schedule: RetrySchedule::default(),
    }
}

pub fn pipeline(
    settings: PipelineSettings,
    storage: &MemoryStorage,
    scoring: Arc<ScriptedScoring>,
) -> AccrualPipeline {
    AccrualPipeline::new(
        settings,
        Arc::new(storage.clone()),
        scoring,
        Arc::new(TokioClock),
    )
}

/// 轮询等待条件成立
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}
