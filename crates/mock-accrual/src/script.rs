//! 脚本化响应

use serde::{Deserialize, Serialize};

/// 对单次查询的预设响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedResponse {
    Registered,
    Processing,
    Invalid,
    Processed { accrual: f64 },
    /// 204，订单未登记
    Unknown,
    /// 429，可选 Retry-After 秒数
    RateLimited {
        #[serde(default)]
        retry_after: Option<u64>,
    },
    /// 500
    ServerError,
}

impl ScriptedResponse {
    /// 200 响应中的状态字段
    pub fn status(&self) -> Option<&'static str> {
        match self {
            Self::Registered => Some("REGISTERED"),
            Self::Processing => Some("PROCESSING"),
            Self::Invalid => Some("INVALID"),
            Self::Processed { .. } => Some("PROCESSED"),
            _ => None,
        }
    }
}

/// 订单脚本：依次消费，最后一项保持不变
#[derive(Debug, Clone, Default)]
pub struct OrderScript {
    responses: Vec<ScriptedResponse>,
    cursor: usize,
}

impl OrderScript {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses,
            cursor: 0,
        }
    }

    /// 取出下一项响应，脚本为空时返回 None
    pub fn next_response(&mut self) -> Option<ScriptedResponse> {
        let last = self.responses.len().checked_sub(1)?;
        let response = self.responses[self.cursor.min(last)].clone();
        if self.cursor < last {
            self.cursor += 1;
        }
        Some(response)
    }
}
