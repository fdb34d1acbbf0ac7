use crate::{
    models::{
        CreateReportRequest, DateRange, NamedRef, PagedResult, Report, ReportDetail, ReportFormat,
        ReportFormatInfo, ReportStatus, ReportType, ReportTypeInfo, ReportTypesResponse, Role,
        ScopeReferences,
    },
    reporting::analytics::StudentRank,
    response::ApiResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // 报告管理API
        crate::handlers::report::create_report,
        crate::handlers::report::list_reports,
        crate::handlers::report::get_report_types,
        crate::handlers::report::get_report,
        crate::handlers::report::regenerate_report,
        crate::handlers::report::delete_report,
        // 成绩分析API
        crate::handlers::analytics::get_student_rank,
    ),
    components(
        schemas(
            // 报告相关模型
            Report,
            ReportType,
            ReportFormat,
            ReportStatus,
            DateRange,
            CreateReportRequest,
            ReportDetail,
            ScopeReferences,
            NamedRef,
            ReportTypeInfo,
            ReportFormatInfo,
            ReportTypesResponse,
            Role,
            // 分析相关模型
            StudentRank,
            // 通用响应模型
            ApiResponse<Report>,
            ApiResponse<ReportDetail>,
            ApiResponse<ReportTypesResponse>,
            ApiResponse<PagedResult<Report>>,
            ApiResponse<StudentRank>,
            PagedResult<Report>,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "报告管理", description = "报告的提交、查询、重新生成与删除"),
        (name = "成绩分析", description = "学生排名与百分位"),
        (name = "系统监控", description = "系统健康状态和统计信息")
    ),
    info(
        title = "CourseHub Reports API",
        version = "1.0.0",
        description = "CourseHub 学习管理平台报告生成服务 REST API 文档",
        contact(
            name = "CourseHub Team",
            email = "contact@example.com"
        ),
        license(
            name = "CC BY-NC-SA 4.0",
            url = "https://creativecommons.org/licenses/by-nc-sa/4.0/"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "开发环境")
    )
)]
pub struct ApiDoc;

/// 注册 Bearer JWT 认证方式
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_report_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/reports"));
        assert!(doc.paths.paths.contains_key("/api/reports/{id}/regenerate"));
        assert!(
            doc.paths
                .paths
                .contains_key("/api/analytics/students/{id}/rank")
        );
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
