//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{get, post},
};
use gophermart_shared::observability::middleware::{http_tracing, request_id};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware::auth_middleware, state::AppState};

/// 公开路由
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(handlers::auth::register))
        .route("/user/login", post(handlers::auth::login))
}

/// 需要登录的路由
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/user/orders",
            post(handlers::orders::submit_order).get(handlers::orders::list_orders),
        )
        .route("/user/balance", get(handlers::balance::get_balance))
        .route("/user/balance/withdraw", post(handlers::balance::withdraw))
        .route("/user/withdrawals", get(handlers::balance::list_withdrawals))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// 构建完整的应用路由
pub fn build_router(state: AppState) -> Router {
    let api = public_routes().merge(user_routes(state.clone()));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api)
        .layer(middleware::from_fn(http_tracing))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
