use crate::{
    auth::AuthUser,
    error::AppError,
    handlers::AppState,
    models::Role,
    reporting::analytics::{RankScope, StudentRank, student_rank},
    response::ApiResponse,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

/// 学生排名
///
/// 在同机构学生中按平均得分率排名。百分位基于排名计算，数值越小排名越靠前。
#[utoipa::path(
    get,
    path = "/api/analytics/students/{id}/rank",
    tag = "成绩分析",
    params(
        ("id" = Uuid, Path, description = "学生ID"),
        RankScope
    ),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<StudentRank>),
        (status = 403, description = "无权访问"),
        (status = 404, description = "学生或作答不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_student_rank(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<Uuid>,
    Query(scope): Query<RankScope>,
) -> Result<Json<ApiResponse<StudentRank>>, AppError> {
    let source = app_state.academic()?;

    // 学生只能查询自己的排名
    if user.role == Role::Student && user.user_id != student_id {
        return Err(AppError::forbidden("students can only view their own rank"));
    }

    let rank = student_rank(source, student_id, scope).await?;

    if !user.is_admin() && user.role != Role::Student && rank.institute_id != user.institute_id {
        return Err(AppError::forbidden("student belongs to another institute"));
    }

    Ok(Json(ApiResponse::success(rank)))
}
