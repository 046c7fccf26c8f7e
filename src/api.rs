mod auth;
mod comments;
mod posts;
mod response;
mod tags;

pub use auth::AdminSession;
pub use response::ApiResponse;

use axum::{Json, Router, http::HeaderValue, routing::get};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::instrument;

use crate::{config::Config, state::AppState};

/// 设置应用的路由
///
/// 业务接口统一挂在 `/api/v1` 下，`/health` 用于存活检查。
pub fn setup_route(app: AppState) -> Router {
    let v1 = auth::setup_route()
        .merge(posts::setup_route())
        .merge(tags::setup_route())
        .merge(comments::setup_route());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1)
        .with_state(app)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 启动 HTTP 服务，并使用给定的路由处理请求
///
/// 收到 Ctrl-C 后停止接收新连接，等待处理中的请求完成。
#[instrument(name = "http server", skip_all, fields(addr = %config.addr))]
pub async fn run_server_with_router(router: Router, config: &Config) {
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind TCP listener on {}: {e}", config.addr));

    tracing::info!("listening on {}", config.addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start Axum server");
}

/// 启动 HTTP 服务，自动设置路由和中间件
///
/// 1. 生成路由
/// 2. 添加跨域、日志和追踪中间件
/// 3. 启动服务器
pub async fn run_server(app: AppState, config: &Config) {
    let router = setup_route(app);
    let router = add_middlewares(router, &config.cors_origins);
    run_server_with_router(router, config).await
}

/// 为路由添加中间件
///
/// 日志只在请求失败时输出；未配置允许的来源时不限制跨域。
fn add_middlewares(router: Router, cors_origins: &[String]) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router
        .layer(cors_layer(cors_origins))
        .layer(
            TraceLayer::new_for_http()
                .on_failure(log_failure)
                .on_request(|_req: &_, _span: &tracing::Span| {
                    // 空实现，关闭请求日志
                }),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
