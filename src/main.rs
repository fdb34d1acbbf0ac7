/*
 * CourseHub - Learning Management Reporting Service
 * Copyright (c) 2024 CourseHub Project
 *
 * This work is licensed under CC BY-NC-SA 4.0
 * https://creativecommons.org/licenses/by-nc-sa/4.0/
 */

use axum::response::Html;
use axum::{
    Router,
    extract::{Query, State},
    http::Method,
    response::Json,
    routing::get,
};
use coursehub_backend::{
    config::Config,
    database::{Database, seed_roles},
    docs::ApiDoc,
    error::AppResult,
    handlers::AppState,
    reporting::AcademicSource,
    repositories::{AcademicRepository, ReportRepository},
    response::ApiResponse,
    routes::create_api_routes,
    services::{ReportOrchestrator, StartupRecovery},
    storage::{MinioStorage, Storage},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

#[derive(Deserialize)]
struct HealthQuery {
    #[serde(default)]
    detail: bool,
}

/// 健康检查处理器
async fn health_check(Query(params): Query<HealthQuery>) -> Json<ApiResponse<serde_json::Value>> {
    if params.detail {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let mut details = HashMap::new();
        details.insert("status", "healthy");
        details.insert("version", env!("CARGO_PKG_VERSION"));
        details.insert("timestamp", timestamp.as_str());

        Json(ApiResponse::success(serde_json::json!(details)))
    } else {
        Json(ApiResponse::success(serde_json::json!({"status": "ok"})))
    }
}

/// 系统信息处理器
async fn system_info(
    State(app_state): State<AppState>,
) -> Json<ApiResponse<HashMap<&'static str, serde_json::Value>>> {
    let mut info = HashMap::new();
    info.insert("name", serde_json::json!("CourseHub Backend"));
    info.insert("version", serde_json::json!(env!("CARGO_PKG_VERSION")));
    info.insert(
        "report_bucket",
        serde_json::json!(app_state.config.report.bucket),
    );
    if let Some(reports) = &app_state.reports {
        let dispatcher = reports.dispatcher();
        info.insert(
            "generation",
            serde_json::json!({
                "capacity": dispatcher.capacity(),
                "running": dispatcher.running_jobs(),
            }),
        );
    }

    Json(ApiResponse::success(info))
}

/// 数据库健康检查处理器
async fn db_health_check(
    State(app_state): State<AppState>,
) -> Json<ApiResponse<serde_json::Value>> {
    match &app_state.database {
        Some(db) => match db.health_check().await {
            Ok(true) => {
                let timestamp = chrono::Utc::now().to_rfc3339();
                let mut details = HashMap::new();
                details.insert("database", "healthy");
                details.insert("timestamp", timestamp.as_str());
                Json(ApiResponse::success(serde_json::json!(details)))
            }
            Ok(false) => Json(ApiResponse::error_with_data(
                503,
                "数据库连接异常".to_string(),
                serde_json::json!({"status": "unhealthy"}),
            )),
            Err(e) => {
                tracing::error!("数据库健康检查失败: {}", e);
                Json(ApiResponse::error_with_data(
                    503,
                    format!("数据库健康检查失败: {}", e),
                    serde_json::json!({"status": "error"}),
                ))
            }
        },
        None => Json(ApiResponse::error_with_data(
            503,
            "数据库未配置或连接失败".to_string(),
            serde_json::json!({"status": "unavailable"}),
        )),
    }
}

/// 存储健康检查处理器
async fn storage_health_check(
    State(app_state): State<AppState>,
) -> Json<ApiResponse<serde_json::Value>> {
    match &app_state.storage {
        Some(storage) => match storage.health_check().await {
            Ok(true) => {
                let timestamp = chrono::Utc::now().to_rfc3339();
                let mut details = HashMap::new();
                details.insert("storage", "healthy");
                details.insert("timestamp", timestamp.as_str());
                Json(ApiResponse::success(serde_json::json!(details)))
            }
            Ok(false) => Json(ApiResponse::error_with_data(
                503,
                "存储服务连接异常".to_string(),
                serde_json::json!({"status": "unhealthy"}),
            )),
            Err(e) => {
                tracing::error!("存储健康检查失败: {}", e);
                Json(ApiResponse::error_with_data(
                    503,
                    format!("存储健康检查失败: {}", e),
                    serde_json::json!({"status": "error"}),
                ))
            }
        },
        None => Json(ApiResponse::error_with_data(
            503,
            "存储服务未配置或连接失败".to_string(),
            serde_json::json!({"status": "unavailable"}),
        )),
    }
}

/// Swagger UI 页面（访问路径：/swagger-ui 或 /swagger-ui/）
/// OpenAPI JSON 路径：/api-docs/openapi.json
async fn swagger_ui_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset=UTF-8>
  <title>CourseHub API 文档</title>
  <link rel=stylesheet href=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui.css>
  <style>
    body { margin: 0; font-family: Arial, sans-serif; }
  </style>
</head>
<body>
  <div id=swagger-ui>
    <div style="padding: 50px; text-align: center;">正在加载 API 文档...</div>
  </div>
  <script src=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui-bundle.js></script>
  <script src=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui-standalone-preset.js></script>
  <script>
    window.onload = function() {
      window.ui = SwaggerUIBundle({
        url: '/api-docs/openapi.json',
        dom_id: '#swagger-ui',
        deepLinking: true,
        presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
        layout: 'StandaloneLayout',
        validatorUrl: null
      });
    };
  </script>
</body>
</html>"#,
    )
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursehub_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let mut config = match Config::from_file("config.toml") {
        Ok(config) => {
            tracing::info!("已加载配置文件: config.toml");
            config
        }
        Err(_) => {
            tracing::warn!("未找到配置文件，使用默认配置");
            let default_config = Config::default();
            // 保存默认配置到文件
            if let Err(e) = default_config.save_to_file("config.toml") {
                tracing::warn!("保存默认配置失败: {}", e);
            }
            default_config
        }
    };
    config.apply_env_overrides();
    config.validate()?;

    tracing::info!("服务器配置: {}", config.server_addr());

    // 初始化数据库（如果连接失败则继续启动，但记录警告）
    let database = match Database::new(&config.database).await {
        Ok(db) => {
            // 验证数据库连接和表结构
            if let Err(e) = db.verify_connection().await {
                tracing::warn!("数据库验证失败: {}", e);
            }
            match seed_roles(&db).await {
                Ok(0) => tracing::debug!("默认角色已存在"),
                Ok(n) => tracing::info!("已写入 {} 个默认角色", n),
                Err(e) => tracing::warn!("写入默认角色失败: {}", e),
            }
            Some(db)
        }
        Err(e) => {
            tracing::warn!("数据库连接失败，服务将在无数据库模式下启动: {}", e);
            None
        }
    };

    // 初始化MinIO存储（如果连接失败则继续启动，但记录警告）
    let storage: Option<Arc<dyn Storage>> = match MinioStorage::new(config.minio.clone()).await {
        Ok(storage) => {
            // 确保报告bucket存在
            if let Err(e) = storage.ensure_bucket(&config.report.bucket).await {
                tracing::warn!("创建报告bucket失败: {}", e);
            }
            Some(Arc::new(storage))
        }
        Err(e) => {
            tracing::warn!("MinIO存储连接失败，存储服务将不可用: {}", e);
            None
        }
    };

    let academic: Option<Arc<dyn AcademicSource>> = database
        .as_ref()
        .map(|db| Arc::new(AcademicRepository::new(db.clone())) as Arc<dyn AcademicSource>);

    // 启动恢复必须先于接收新请求
    let reports = match (&database, &storage, &academic) {
        (Some(db), Some(storage), Some(academic)) => {
            let store = Arc::new(ReportRepository::new(db.clone()));

            let recovery = StartupRecovery::new(store.clone(), config.startup_recovery.clone());
            match recovery.run().await {
                Ok(stats) => tracing::info!(
                    "启动恢复完成，{} 个中断的报告已标记为失败",
                    stats.interrupted_failed
                ),
                Err(e) => tracing::warn!("启动恢复失败: {}", e),
            }

            let orchestrator = ReportOrchestrator::new(
                store,
                academic.clone(),
                storage.clone(),
                config.report.clone(),
            );
            tracing::info!(
                "报告服务初始化成功，最大并发生成数: {}",
                orchestrator.dispatcher().capacity()
            );
            Some(orchestrator)
        }
        _ => {
            tracing::warn!("报告服务初始化跳过：缺少必要的依赖（数据库/存储）");
            None
        }
    };

    // 创建应用状态
    let app_state = AppState {
        database,
        storage,
        reports,
        academic,
        config: config.clone(),
    };

    // 创建CORS中间件
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let app = Router::new()
        // 健康检查和系统信息
        .route("/health", get(health_check))
        .route("/api/system/info", get(system_info))
        .route("/api/health/db", get(db_health_check))
        .route("/api/health/storage", get(storage_health_check))
        // OpenAPI JSON 路由
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Swagger UI 页面
        .route("/swagger-ui", get(swagger_ui_page))
        .route("/swagger-ui/", get(swagger_ui_page))
        // 业务API路由
        .merge(create_api_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(&config.server_addr()).await?;
    tracing::info!("🚀 服务器启动成功，监听地址: {}", config.server_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
