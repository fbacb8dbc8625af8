//! 对账流水线错误类型

use thiserror::Error;

use crate::error::LoyaltyError;

/// 外部积分服务调用错误
#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("积分服务请求超时")]
    Timeout,

    #[error("积分服务请求失败: {0}")]
    Request(#[source] reqwest::Error),

    #[error("积分服务内部错误: HTTP {status}")]
    Upstream { status: u16 },

    #[error("积分服务返回非预期状态码: HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("积分服务响应解析失败: {0}")]
    Decode(String),

    #[error("积分服务返回的订单号不匹配: 请求 {expected}, 响应 {actual}")]
    OrderMismatch { expected: String, actual: String },

    #[error("积分服务返回了非法积分: 订单 {order_number}, 积分 {accrual}")]
    InvalidAccrual {
        order_number: String,
        accrual: rust_decimal::Decimal,
    },

    #[error("积分服务地址不合法: {0}")]
    InvalidBaseUrl(String),
}

impl AccrualError {
    /// 是否为瞬时故障（网络、超时、5xx），下一轮扫描会自然重试
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Request(_) | Self::Upstream { .. })
    }
}

impl From<reqwest::Error> for AccrualError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

/// 汇聚到错误观察者的运行期错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("扫描待处理订单失败: {source}")]
    Discovery {
        #[source]
        source: LoyaltyError,
    },

    #[error("查询订单 {order_number} 积分失败: {source}")]
    Scoring {
        order_number: String,
        #[source]
        source: AccrualError,
    },

    #[error("回写订单 {order_number} 失败: {source}")]
    Update {
        order_number: String,
        #[source]
        source: LoyaltyError,
    },
}

impl PipelineError {
    /// 出错的流水线阶段，用作日志和指标标签
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "discovery",
            Self::Scoring { .. } => "scoring",
            Self::Update { .. } => "update",
        }
    }

    /// 关联的订单号
    pub fn order_number(&self) -> Option<&str> {
        match self {
            Self::Discovery { .. } => None,
            Self::Scoring { order_number, .. } | Self::Update { order_number, .. } => {
                Some(order_number)
            }
        }
    }
}
