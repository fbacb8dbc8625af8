//! Mock 积分服务 HTTP 接口
//!
//! - `GET /api/orders/{number}`: 按脚本应答
//! - `POST /mock/orders`: 设置订单脚本 `{order, responses}`
//! - `GET /mock/calls/{number}`: 查询调用次数
//! - `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::limiter::RpmLimiter;
use crate::script::ScriptedResponse;
use crate::store::ScriptStore;

/// 服务参数
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    pub port: u16,
    /// 每分钟请求上限，None 表示不限
    pub max_rpm: Option<u32>,
    /// 超限时返回的 Retry-After 秒数
    pub retry_after_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 0,
            max_rpm: None,
            retry_after_secs: 60,
        }
    }
}

/// 路由共享状态
#[derive(Clone)]
pub struct MockAccrualState {
    pub store: ScriptStore,
    limiter: Option<Arc<RpmLimiter>>,
    retry_after_secs: u64,
}

impl MockAccrualState {
    pub fn new(settings: &ServerSettings) -> Self {
        Self {
            store: ScriptStore::new(),
            limiter: settings.max_rpm.map(|rpm| Arc::new(RpmLimiter::new(rpm))),
            retry_after_secs: settings.retry_after_secs,
        }
    }
}

/// 设置脚本请求
#[derive(Debug, Deserialize)]
pub struct ScriptRequest {
    pub order: String,
    pub responses: Vec<ScriptedResponse>,
}

#[derive(Debug, Serialize)]
pub struct CallsResponse {
    pub order: String,
    pub calls: u64,
}

/// 构建路由
pub fn router(state: MockAccrualState) -> Router {
    Router::new()
        .route("/api/orders/{number}", get(get_order))
        .route("/mock/orders", post(set_script))
        .route("/mock/calls/{number}", get(get_calls))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .with_state(state)
}

fn rate_limited(retry_after: Option<u64>) -> Response {
    match retry_after {
        Some(secs) => (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, secs.to_string())],
            "No more than N requests per minute allowed",
        )
            .into_response(),
        None => StatusCode::TOO_MANY_REQUESTS.into_response(),
    }
}

async fn get_order(State(state): State<MockAccrualState>, Path(number): Path<String>) -> Response {
    state.store.record_call(&number);

    if let Some(limiter) = &state.limiter
        && !limiter.try_acquire()
    {
        debug!(order = %number, "超出每分钟请求上限");
        return rate_limited(Some(state.retry_after_secs));
    }

    let response = state.store.next_response(&number);
    debug!(order = %number, ?response, "应答积分查询");

    match response {
        ScriptedResponse::Unknown => StatusCode::NO_CONTENT.into_response(),
        ScriptedResponse::RateLimited { retry_after } => rate_limited(retry_after),
        ScriptedResponse::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        ScriptedResponse::Processed { accrual } => Json(json!({
            "order": number,
            "status": "PROCESSED",
            "accrual": accrual,
        }))
        .into_response(),
        other => Json(json!({
            "order": number,
            "status": other.status(),
        }))
        .into_response(),
    }
}

async fn set_script(
    State(state): State<MockAccrualState>,
    Json(req): Json<ScriptRequest>,
) -> StatusCode {
    info!(order = %req.order, steps = req.responses.len(), "设置订单脚本");
    state.store.script(&req.order, req.responses);
    StatusCode::NO_CONTENT
}

async fn get_calls(
    State(state): State<MockAccrualState>,
    Path(number): Path<String>,
) -> Json<CallsResponse> {
    Json(CallsResponse {
        calls: state.store.calls(&number),
        order: number,
    })
}

/// 运行在后台任务中的服务实例，drop 时停止
pub struct MockAccrualServer {
    addr: SocketAddr,
    state: MockAccrualState,
    handle: JoinHandle<()>,
}

impl MockAccrualServer {
    /// 在 127.0.0.1 上启动，端口为 0 时随机分配
    pub async fn spawn(settings: ServerSettings) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", settings.port)).await?;
        let addr = listener.local_addr()?;
        let state = MockAccrualState::new(&settings);
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock 积分服务异常退出");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn store(&self) -> &ScriptStore {
        &self.state.store
    }
}

impl Drop for MockAccrualServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn call(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_scripted_sequence() {
        let state = MockAccrualState::new(&ServerSettings::default());
        state.store.script(
            "79927398713",
            vec![
                ScriptedResponse::RateLimited {
                    retry_after: Some(10),
                },
                ScriptedResponse::Processed { accrual: 500.0 },
            ],
        );
        let app = router(state.clone());

        let res = call(&app, "/api/orders/79927398713").await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[RETRY_AFTER], "10");

        let res = call(&app, "/api/orders/79927398713").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "PROCESSED");
        assert_eq!(value["accrual"], 500.0);

        assert_eq!(state.store.calls("79927398713"), 2);
    }

    #[tokio::test]
    async fn test_unknown_order_and_rpm_limit() {
        let state = MockAccrualState::new(&ServerSettings {
            max_rpm: Some(1),
            retry_after_secs: 30,
            ..ServerSettings::default()
        });
        let app = router(state);

        assert_eq!(call(&app, "/api/orders/0").await.status(), StatusCode::NO_CONTENT);

        let res = call(&app, "/api/orders/0").await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[RETRY_AFTER], "30");
    }
}
