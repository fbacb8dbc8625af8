//! 重试调度策略
//!
//! 瞬时故障与限流都不在原地重试，而是等待下一轮扫描；
//! 本模块给出下一轮扫描的时刻以及限流后的冷却时长。

use std::time::Duration;

use gophermart_shared::config::AccrualConfig;
use tokio::time::Instant;

/// 扫描间隔与冷却策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    /// 常规扫描间隔
    pub poll_interval: Duration,
    /// 429 未携带 Retry-After 时的冷却时长
    pub default_cooldown: Duration,
    /// Retry-After 提示的上限
    pub max_cooldown: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            default_cooldown: Duration::from_secs(10),
            max_cooldown: Duration::from_secs(300),
        }
    }
}

impl RetrySchedule {
    pub fn from_config(config: &AccrualConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            default_cooldown: config.default_cooldown(),
            max_cooldown: config.max_cooldown(),
        }
    }

    /// 冷却时长：优先采用服务端提示（封顶），缺失或为 0 时使用默认值
    pub fn cooldown_for(&self, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) if !hint.is_zero() => hint.min(self.max_cooldown),
            _ => self.default_cooldown,
        }
    }

    /// 常规的下一次扫描时刻
    pub fn next_tick(&self, last_poll: Instant) -> Instant {
        last_poll + self.poll_interval
    }

    /// 实际唤醒时刻：冷却覆盖常规节拍，冷却结束后立即扫描
    pub fn next_wake(&self, next_tick: Instant, cooldown_until: Option<Instant>) -> Instant {
        match cooldown_until {
            Some(until) if until > next_tick => until,
            _ => next_tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_for() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.cooldown_for(None), Duration::from_secs(10));
        assert_eq!(schedule.cooldown_for(Some(Duration::ZERO)), Duration::from_secs(10));
        assert_eq!(
            schedule.cooldown_for(Some(Duration::from_secs(60))),
            Duration::from_secs(60)
        );
        assert_eq!(
            schedule.cooldown_for(Some(Duration::from_secs(3600))),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_next_wake() {
        let schedule = RetrySchedule::default();
        let start = Instant::now();
        let tick = schedule.next_tick(start);
        assert_eq!(tick, start + Duration::from_secs(2));

        assert_eq!(schedule.next_wake(tick, None), tick);

        let early = start + Duration::from_secs(1);
        assert_eq!(schedule.next_wake(tick, Some(early)), tick);

        let late = start + Duration::from_secs(10);
        assert_eq!(schedule.next_wake(tick, Some(late)), late);
    }

    #[test]
    fn test_from_config() {
        let config = AccrualConfig {
            poll_interval_ms: 500,
            default_cooldown_secs: 3,
            max_cooldown_secs: 30,
            ..Default::default()
        };
        let schedule = RetrySchedule::from_config(&config);
        assert_eq!(schedule.poll_interval, Duration::from_millis(500));
        assert_eq!(schedule.default_cooldown, Duration::from_secs(3));
        assert_eq!(schedule.max_cooldown, Duration::from_secs(30));
    }
}
