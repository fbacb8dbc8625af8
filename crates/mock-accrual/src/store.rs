//! 内存存储
//!
//! 使用 DashMap 保存订单脚本与调用计数，支持并发请求。

use std::sync::Arc;

use dashmap::DashMap;

use crate::script::{OrderScript, ScriptedResponse};

/// 脚本与调用计数存储
#[derive(Debug, Clone, Default)]
pub struct ScriptStore {
    scripts: Arc<DashMap<String, OrderScript>>,
    calls: Arc<DashMap<String, u64>>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为订单设置脚本，覆盖已有脚本
    pub fn script(&self, order: &str, responses: Vec<ScriptedResponse>) {
        self.scripts
            .insert(order.to_string(), OrderScript::new(responses));
    }

    /// 记录一次调用
    pub fn record_call(&self, order: &str) {
        *self.calls.entry(order.to_string()).or_insert(0) += 1;
    }

    /// 取出订单的下一项响应，未设置脚本时视为未登记
    pub fn next_response(&self, order: &str) -> ScriptedResponse {
        self.scripts
            .get_mut(order)
            .and_then(|mut script| script.next_response())
            .unwrap_or(ScriptedResponse::Unknown)
    }

    /// 订单被查询的次数
    pub fn calls(&self, order: &str) -> u64 {
        self.calls.get(order).map(|c| *c).unwrap_or(0)
    }

    /// 所有订单的查询总次数
    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }
}
