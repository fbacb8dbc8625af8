//! 外部积分服务客户端
//!
//! 按订单号查询 `GET {base}/api/orders/{number}`，把响应翻译为领域结果：
//!
//! | 响应 | 结果 |
//! |---|---|
//! | 200 REGISTERED / PROCESSING | 订单 → PROCESSING |
//! | 200 INVALID | 订单 → INVALID，积分 0 |
//! | 200 PROCESSED | 订单 → PROCESSED，积分为返回值 |
//! | 204 | 外部服务未知该订单，不修改 |
//! | 429 | 限流，给出冷却时长，不修改 |
//! | 5xx / 网络错误 | 瞬时故障 |

use std::time::{Duration, Instant};

use async_trait::async_trait;
use gophermart_shared::config::AccrualConfig;
use gophermart_shared::observability::metrics;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::AccrualError;
use super::schedule::RetrySchedule;
use crate::models::{Order, OrderStatus};

/// 外部服务的订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl ExternalStatus {
    /// 对应的本地订单状态
    pub fn order_status(&self) -> OrderStatus {
        match self {
            Self::Registered | Self::Processing => OrderStatus::Processing,
            Self::Invalid => OrderStatus::Invalid,
            Self::Processed => OrderStatus::Processed,
        }
    }
}

/// 外部服务的查询结果，只用于更新订单，不单独落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub order: String,
    pub status: ExternalStatus,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub accrual: Option<Decimal>,
}

impl ScoringResult {
    /// 校验响应：订单号必须与请求一致，积分不能为负
    pub fn validate(&self, expected: &str) -> Result<(), AccrualError> {
        if self.order != expected {
            return Err(AccrualError::OrderMismatch {
                expected: expected.to_string(),
                actual: self.order.clone(),
            });
        }
        if let Some(accrual) = self.accrual
            && accrual < Decimal::ZERO
        {
            return Err(AccrualError::InvalidAccrual {
                order_number: self.order.clone(),
                accrual,
            });
        }
        Ok(())
    }

    /// 把结果应用到订单上，迁移不合法（如订单已是终态）时返回 None
    pub fn apply_to(&self, order: &Order) -> Option<Order> {
        // 按存储列精度取整到分
        let accrual = self
            .accrual
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        order.transitioned(self.status.order_status(), accrual)
    }
}

/// 单次查询的领域结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringOutcome {
    /// 确定结果，需要回写
    Scored(ScoringResult),
    /// 外部服务尚未登记该订单
    Unknown,
    /// 被限流，冷却时长已按策略计算
    RateLimited { cooldown: Duration },
}

/// 积分查询能力
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn score(&self, order_number: &str) -> Result<ScoringOutcome, AccrualError>;
}

/// 基于 reqwest 的积分服务客户端
#[derive(Clone)]
pub struct AccrualClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    schedule: RetrySchedule,
}

impl AccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self, AccrualError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(AccrualError::Request)?;

        Ok(Self {
            http,
            base_url: normalize_base_url(&config.base_url)?,
            request_timeout: config.request_timeout(),
            schedule: RetrySchedule::from_config(config),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn order_url(&self, order_number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, order_number)
    }

    async fn lookup(&self, order_number: &str) -> Result<ScoringOutcome, AccrualError> {
        let response = self
            .http
            .get(self.order_url(order_number))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let result: ScoringResult = response.json().await?;
                result.validate(order_number)?;
                Ok(ScoringOutcome::Scored(result))
            }
            StatusCode::NO_CONTENT => Ok(ScoringOutcome::Unknown),
            StatusCode::TOO_MANY_REQUESTS => {
                let hint = retry_after(response.headers());
                Ok(ScoringOutcome::RateLimited {
                    cooldown: self.schedule.cooldown_for(hint),
                })
            }
            s if s.is_server_error() => Err(AccrualError::Upstream { status: s.as_u16() }),
            s => Err(AccrualError::UnexpectedStatus { status: s.as_u16() }),
        }
    }
}

#[async_trait]
impl ScoringService for AccrualClient {
    #[instrument(skip(self))]
    async fn score(&self, order_number: &str) -> Result<ScoringOutcome, AccrualError> {
        let started = Instant::now();
        let result = self.lookup(order_number).await;
        let elapsed = started.elapsed().as_secs_f64();

        let label = match &result {
            Ok(ScoringOutcome::Scored(r)) => match r.status {
                ExternalStatus::Registered => "registered",
                ExternalStatus::Processing => "processing",
                ExternalStatus::Invalid => "invalid",
                ExternalStatus::Processed => "processed",
            },
            Ok(ScoringOutcome::Unknown) => "unknown",
            Ok(ScoringOutcome::RateLimited { .. }) => "rate_limited",
            Err(AccrualError::Timeout) => "timeout",
            Err(_) => "error",
        };
        metrics::record_accrual_request(label, elapsed);
        debug!(outcome = label, elapsed_secs = elapsed, "积分查询完成");

        result
    }
}

/// 规范化服务地址：去掉末尾斜杠，缺少协议时补 http://
pub fn normalize_base_url(raw: &str) -> Result<String, AccrualError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AccrualError::InvalidBaseUrl(raw.to_string()));
    }
    if trimmed.contains("://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{}", trimmed))
    }
}

/// 解析 Retry-After 秒数，HTTP 日期格式按缺失处理
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
