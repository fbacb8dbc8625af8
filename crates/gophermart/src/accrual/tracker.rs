//! 派发去重
//!
//! 同一订单在队列中或调用进行中时不会被重复派发；
//! 在当前扫描快照之后才完成的订单也不会在同一轮被再次派发，
//! 保证每轮扫描对每个订单至多发起一次外部调用。

use std::collections::HashSet;

use parking_lot::Mutex;

#[derive(Default)]
struct TrackerState {
    in_flight: HashSet<i64>,
    settled: HashSet<i64>,
}

/// 订单派发跟踪
#[derive(Default)]
pub struct DispatchTracker {
    state: Mutex<TrackerState>,
}

impl DispatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新一轮扫描，在查询存储之前调用
    pub fn begin_cycle(&self) {
        self.state.lock().settled.clear();
    }

    /// 占用订单，已在处理或本轮已完成时返回 false
    pub fn try_claim(&self, order_id: i64) -> bool {
        let mut state = self.state.lock();
        if state.settled.contains(&order_id) {
            return false;
        }
        state.in_flight.insert(order_id)
    }

    /// 消费者处理完毕
    pub fn release(&self, order_id: i64) {
        let mut state = self.state.lock();
        state.in_flight.remove(&order_id);
        state.settled.insert(order_id);
    }

    /// 未能入队的订单，放弃占用
    pub fn abandon(&self, order_id: i64) {
        self.state.lock().in_flight.remove(&order_id);
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}
