pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod ui;

use crate::{
    diagnosis::CLASS_NAMES,
    models::{self, LeafModel, ModelManager},
    utils::error::DetectorError,
    Config, Result,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

/// 处理器共享状态：配置和只读模型句柄
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub model: Arc<dyn LeafModel>,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn LeafModel>) -> Self {
        Self { config, model }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    // 在监听端口之前加载模型；失败即退出
    let manager = ModelManager::init(config.clone())?;
    let state = AppState::new(config.clone(), manager.model());

    let app = create_app(state);

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        DetectorError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                    - Web UI");
    tracing::info!("  POST /                    - Web UI form upload");
    tracing::info!("  POST /api/predict         - JSON base64 upload");
    tracing::info!("  POST /api/predict/upload  - Multipart file upload");
    tracing::info!("  GET  /health              - Health check");
    tracing::info!("  GET  /api/info            - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        DetectorError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DetectorError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = state.config.server_config.clone();

    Router::new()
        // Web UI路由
        .route("/", get(ui::index_handler).post(ui::upload_page_handler))
        .route("/static/style.css", get(ui::style_handler))
        // 预测API路由
        .route("/api/predict", post(handlers::predict_json_handler))
        .route("/api/predict/upload", post(handlers::predict_upload_handler))
        // 系统路由
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        // 超限由提取器报告，处理器据此渲染错误页或JSON错误体
        .layer(DefaultBodyLimit::max(server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(server_config.request_timeout)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let model = Arc::clone(&state.model);
    tokio::task::spawn_blocking(move || models::health_check(model.as_ref()))
        .await
        .map_err(|e| DetectorError::Internal(format!("Health check task failed: {}", e)))??;

    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "Plant Disease Detector",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "classes": CLASS_NAMES,
        "model": state.model.stats(),
        "limits": {
            "max_upload_bytes": state.config.server_config.max_upload_bytes,
            "request_timeout_secs": state.config.server_config.request_timeout,
        },
        "accepted_formats": ["jpg", "jpeg", "png"]
    }))
}
