//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册指标描述，出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "accrual_requests_total",
        "Lookups issued against the accrual service, by outcome"
    );
    metrics::describe_histogram!(
        "accrual_request_duration_seconds",
        "Accrual service lookup duration in seconds"
    );
    metrics::describe_counter!(
        "accrual_cooldowns_total",
        "Rate-limit cooldowns started after a 429 response"
    );
    metrics::describe_counter!(
        "accrual_order_updates_total",
        "Order status writes applied by the accrual pipeline"
    );
    metrics::describe_gauge!(
        "accrual_discovered_orders",
        "Non-terminal orders seen by the last discovery cycle"
    );
    metrics::describe_counter!(
        "accrual_pipeline_errors_total",
        "Operational errors reported by pipeline stage"
    );
    metrics::describe_counter!(
        "accrual_pipeline_errors_dropped_total",
        "Operational errors dropped because the error sink lagged"
    );

    metrics::describe_counter!("withdrawals_total", "Withdrawal attempts by result");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次外部积分查询
#[inline]
pub fn record_accrual_request(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("accrual_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("accrual_request_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

/// 记录限流冷却
#[inline]
pub fn record_accrual_cooldown(cooldown_secs: f64) {
    metrics::counter!("accrual_cooldowns_total").increment(1);
    metrics::histogram!("accrual_cooldown_seconds").record(cooldown_secs);
}

/// 记录订单状态回写
#[inline]
pub fn record_order_update(status: &str) {
    metrics::counter!("accrual_order_updates_total", "status" => status.to_string()).increment(1);
}

/// 记录单轮扫描发现的待处理订单数
#[inline]
pub fn set_discovered_orders(count: usize) {
    metrics::gauge!("accrual_discovered_orders").set(count as f64);
}

/// 记录流水线错误
#[inline]
pub fn record_pipeline_error(stage: &'static str) {
    metrics::counter!("accrual_pipeline_errors_total", "stage" => stage).increment(1);
}

/// 记录错误汇聚端因积压丢弃的错误数
#[inline]
pub fn record_pipeline_errors_dropped(count: u64) {
    metrics::counter!("accrual_pipeline_errors_dropped_total").increment(count);
}

/// 记录提现结果
#[inline]
pub fn record_withdrawal(result: &'static str) {
    metrics::counter!("withdrawals_total", "result" => result).increment(1);
}
