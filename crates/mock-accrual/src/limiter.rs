//! 每分钟请求数限制（固定窗口）

use std::time::{Duration, Instant};

use parking_lot::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

/// 固定窗口限流器
#[derive(Debug)]
pub struct RpmLimiter {
    max_rpm: u32,
    window: Mutex<(Instant, u32)>,
}

impl RpmLimiter {
    pub fn new(max_rpm: u32) -> Self {
        Self {
            max_rpm,
            window: Mutex::new((Instant::now(), 0)),
        }
    }

    /// 尝试占用一个请求名额
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock();
        if now.duration_since(window.0) >= WINDOW {
            *window = (now, 0);
        }
        if window.1 >= self.max_rpm {
            return false;
        }
        window.1 += 1;
        true
    }
}
