use crate::handlers::{
    AppState, create_report, delete_report, get_report, get_report_types, get_student_rank,
    list_reports, regenerate_report,
};
use axum::{
    Router,
    routing::{delete as axum_delete, get, post},
};

/// 创建API路由
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        // 报告管理API
        .route("/api/reports", post(create_report)) // 提交报告
        .route("/api/reports", get(list_reports)) // 报告列表
        .route("/api/reports/types", get(get_report_types)) // 支持的类型与格式
        .route("/api/reports/{id}", get(get_report)) // 报告详情
        .route("/api/reports/{id}", axum_delete(delete_report)) // 删除报告
        .route("/api/reports/{id}/regenerate", post(regenerate_report)) // 重新生成
        // 成绩分析API
        .route("/api/analytics/students/{id}/rank", get(get_student_rank)) // 学生排名
}
