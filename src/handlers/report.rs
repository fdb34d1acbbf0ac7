use crate::{
    auth::AuthUser,
    error::AppError,
    handlers::AppState,
    models::{
        CreateReportRequest, PagedResult, Report, ReportDetail, ReportQueryParams,
        ReportTypesResponse,
    },
    response::ApiResponse,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

/// 提交报告
///
/// 校验通过后以 pending 状态入库并立即返回，文件在后台生成。通过查询接口获取生成结果。
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "报告管理",
    request_body(
        content = CreateReportRequest,
        description = "报告类型、格式与对应的范围字段",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "已提交", body = ApiResponse<Report>),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未认证"),
        (status = 404, description = "范围实体不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_report(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateReportRequest>,
) -> Result<ApiResponse<Report>, AppError> {
    let (report, _job) = app_state.reports()?.submit(request, &user).await?;
    Ok(ApiResponse::created(report, "报告已提交，正在后台生成".to_string()))
}

/// 查询报告列表
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "报告管理",
    params(ReportQueryParams),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<PagedResult<Report>>),
        (status = 401, description = "未认证")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_reports(
    State(app_state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ReportQueryParams>,
) -> Result<Json<ApiResponse<PagedResult<Report>>>, AppError> {
    let result = app_state.reports()?.list(params, &user).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// 支持的报告类型与格式
#[utoipa::path(
    get,
    path = "/api/reports/types",
    tag = "报告管理",
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<ReportTypesResponse>),
        (status = 401, description = "未认证")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_report_types(_user: AuthUser) -> Json<ApiResponse<ReportTypesResponse>> {
    Json(ApiResponse::success(ReportTypesResponse::advertised()))
}

/// 获取报告详情
///
/// 返回报告及其关联实体名称。只读，不会触发生成。
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "报告管理",
    params(
        ("id" = Uuid, Path, description = "报告ID")
    ),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<ReportDetail>),
        (status = 403, description = "无权访问"),
        (status = 404, description = "报告不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportDetail>>, AppError> {
    let detail = app_state.reports()?.get(report_id, &user).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 重新生成报告
#[utoipa::path(
    post,
    path = "/api/reports/{id}/regenerate",
    tag = "报告管理",
    params(
        ("id" = Uuid, Path, description = "报告ID")
    ),
    responses(
        (status = 200, description = "已重新提交", body = ApiResponse<Report>),
        (status = 400, description = "报告正在生成"),
        (status = 403, description = "仅创建者或管理员可操作"),
        (status = 404, description = "报告不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn regenerate_report(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Report>>, AppError> {
    let (report, _job) = app_state.reports()?.regenerate(report_id, &user).await?;
    Ok(Json(ApiResponse::success_with_message(
        report,
        "报告已重新提交生成".to_string(),
    )))
}

/// 删除报告
#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    tag = "报告管理",
    params(
        ("id" = Uuid, Path, description = "报告ID")
    ),
    responses(
        (status = 200, description = "删除成功"),
        (status = 403, description = "仅创建者或管理员可操作"),
        (status = 404, description = "报告不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_report(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    app_state.reports()?.remove(report_id, &user).await?;
    Ok(Json(ApiResponse::<()>::success_empty()))
}
