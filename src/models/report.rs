use super::{NamedRef, Pagination};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// 报告类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_type_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// 学生成绩报告
    Student,
    /// 科目报告
    Subject,
    /// 课程报告
    Course,
    /// 课程包报告
    Package,
    /// 单次测试报告
    Test,
    /// 机构报告
    Institute,
    /// 全局报告
    Overall,
}

/// 报告范围字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeField {
    Institute,
    Student,
    Subject,
    Course,
    Package,
    Test,
}

impl ScopeField {
    pub const ALL: [ScopeField; 6] = [
        ScopeField::Institute,
        ScopeField::Student,
        ScopeField::Subject,
        ScopeField::Course,
        ScopeField::Package,
        ScopeField::Test,
    ];

    /// 请求体中的字段名
    pub fn field_name(&self) -> &'static str {
        match self {
            ScopeField::Institute => "institute_id",
            ScopeField::Student => "student_id",
            ScopeField::Subject => "subject_id",
            ScopeField::Course => "course_id",
            ScopeField::Package => "package_id",
            ScopeField::Test => "test_id",
        }
    }
}

impl ReportType {
    pub const ALL: [ReportType; 7] = [
        ReportType::Student,
        ReportType::Subject,
        ReportType::Course,
        ReportType::Package,
        ReportType::Test,
        ReportType::Institute,
        ReportType::Overall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Student => "student",
            ReportType::Subject => "subject",
            ReportType::Course => "course",
            ReportType::Package => "package",
            ReportType::Test => "test",
            ReportType::Institute => "institute",
            ReportType::Overall => "overall",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportType::Student => "Student Performance Report",
            ReportType::Subject => "Subject Performance Report",
            ReportType::Course => "Course Performance Report",
            ReportType::Package => "Package Performance Report",
            ReportType::Test => "Test Analysis Report",
            ReportType::Institute => "Institute Performance Report",
            ReportType::Overall => "Overall Platform Report",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportType::Student => "Test results and subject-wise performance of one student",
            ReportType::Subject => "Test-wise performance of all attempts in one subject",
            ReportType::Course => "Subject and student performance across a course",
            ReportType::Package => "Course and student performance across a package",
            ReportType::Test => "Question-level analysis and student results of one test",
            ReportType::Institute => "Course, subject and test performance of one institute",
            ReportType::Overall => "Platform-wide counts and performance breakdowns",
        }
    }

    /// 该类型必须提供的范围字段（overall 无需范围）
    pub fn required_scope(&self) -> Option<ScopeField> {
        match self {
            ReportType::Student => Some(ScopeField::Student),
            ReportType::Subject => Some(ScopeField::Subject),
            ReportType::Course => Some(ScopeField::Course),
            ReportType::Package => Some(ScopeField::Package),
            ReportType::Test => Some(ScopeField::Test),
            ReportType::Institute => Some(ScopeField::Institute),
            ReportType::Overall => None,
        }
    }

    /// 是否在类型列表接口中对外展示（package 类型暂不开放）
    pub fn is_advertised(&self) -> bool {
        !matches!(self, ReportType::Package)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_format_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    #[serde(alias = "excel", alias = "xlsx")]
    Spreadsheet,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 2] = [ReportFormat::Pdf, ReportFormat::Spreadsheet];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Spreadsheet => "spreadsheet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "PDF Document",
            ReportFormat::Spreadsheet => "Excel Spreadsheet",
        }
    }

    /// 是否在类型列表接口中对外展示（表格格式暂不开放）
    pub fn is_advertised(&self) -> bool {
        matches!(self, ReportFormat::Pdf)
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 报告状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// 等待生成
    Pending,
    /// 生成中
    Processing,
    /// 已完成
    Completed,
    /// 失败
    Failed,
}

impl ReportStatus {
    /// 状态机：pending → processing → completed|failed，终态仅能经重新生成回到 pending
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        use ReportStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Pending)
                | (Failed, Pending)
                | (Pending, Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 报告数据模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Report {
    pub id: Uuid,
    /// 报告名称
    pub name: String,
    /// 报告描述
    pub description: Option<String>,
    pub report_type: ReportType,
    pub format: ReportFormat,
    pub status: ReportStatus,
    /// 请求者ID
    pub requested_by: Uuid,
    pub institute_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
    /// 统计时间范围
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// 额外筛选条件
    pub filters: JsonValue,
    /// 报告文件地址（完成后设置）
    pub file_url: Option<String>,
    /// 错误信息（失败后设置）
    pub error_message: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// 按范围字段读取对应ID
    pub fn scope_id(&self, field: ScopeField) -> Option<Uuid> {
        match field {
            ScopeField::Institute => self.institute_id,
            ScopeField::Student => self.student_id,
            ScopeField::Subject => self.subject_id,
            ScopeField::Course => self.course_id,
            ScopeField::Package => self.package_id,
            ScopeField::Test => self.test_id,
        }
    }

    /// 读取报告类型要求的范围ID
    pub fn required_scope_id(&self) -> AppResult<Option<Uuid>> {
        match self.report_type.required_scope() {
            None => Ok(None),
            Some(field) => self.scope_id(field).map(Some).ok_or_else(|| {
                AppError::validation(format!(
                    "{} is required for {} reports",
                    field.field_name(),
                    self.report_type
                ))
            }),
        }
    }
}

/// 统计时间范围
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// 创建报告的请求模型
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub name: String,
    pub description: Option<String>,
    pub report_type: ReportType,
    #[serde(default = "default_format")]
    pub format: ReportFormat,
    pub institute_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
    pub date_range: Option<DateRange>,
    pub filters: Option<JsonValue>,
}

fn default_format() -> ReportFormat {
    ReportFormat::Pdf
}

impl CreateReportRequest {
    /// 按范围字段读取对应ID
    pub fn scope_id(&self, field: ScopeField) -> Option<Uuid> {
        match field {
            ScopeField::Institute => self.institute_id,
            ScopeField::Student => self.student_id,
            ScopeField::Subject => self.subject_id,
            ScopeField::Course => self.course_id,
            ScopeField::Package => self.package_id,
            ScopeField::Test => self.test_id,
        }
    }

    /// 提交前校验，失败时不会落库
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }

        if let Some(field) = self.report_type.required_scope() {
            if self.scope_id(field).is_none() {
                return Err(AppError::validation(format!(
                    "{} is required for {} reports",
                    field.field_name(),
                    self.report_type
                )));
            }
        }

        if let Some(range) = &self.date_range {
            if let (Some(start), Some(end)) = (range.start_date, range.end_date) {
                if start > end {
                    return Err(AppError::validation(
                        "date_range.start_date must not be after date_range.end_date",
                    ));
                }
            }
        }

        if let Some(filters) = &self.filters {
            if !filters.is_object() {
                return Err(AppError::validation("filters must be a JSON object"));
            }
        }

        Ok(())
    }
}

/// 待入库的报告记录
#[derive(Debug, Clone)]
pub struct NewReport {
    pub name: String,
    pub description: Option<String>,
    pub report_type: ReportType,
    pub format: ReportFormat,
    pub requested_by: Uuid,
    pub institute_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub filters: JsonValue,
}

impl NewReport {
    pub fn from_request(request: CreateReportRequest, requested_by: Uuid) -> Self {
        let range = request.date_range.unwrap_or_default();
        Self {
            name: request.name.trim().to_string(),
            description: request.description.filter(|d| !d.trim().is_empty()),
            report_type: request.report_type,
            format: request.format,
            requested_by,
            institute_id: request.institute_id,
            student_id: request.student_id,
            subject_id: request.subject_id,
            course_id: request.course_id,
            package_id: request.package_id,
            test_id: request.test_id,
            date_from: range.start_date,
            date_to: range.end_date,
            filters: request
                .filters
                .unwrap_or_else(|| JsonValue::Object(Default::default())),
        }
    }
}

/// 报告列表查询参数
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ReportQueryParams {
    /// 页码，从1开始
    pub page: Option<u32>,
    /// 每页数量，默认20，最大100
    #[serde(alias = "page_size")]
    pub limit: Option<u32>,
    /// 名称/描述模糊搜索
    pub search: Option<String>,
    pub report_type: Option<ReportType>,
    pub format: Option<ReportFormat>,
    pub status: Option<ReportStatus>,
    pub institute_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
    /// 创建时间范围开始，ISO 8601
    pub start_date: Option<DateTime<Utc>>,
    /// 创建时间范围结束，ISO 8601
    pub end_date: Option<DateTime<Utc>>,
}

/// 报告查询过滤器
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub search: Option<String>,
    pub report_type: Option<ReportType>,
    pub format: Option<ReportFormat>,
    pub status: Option<ReportStatus>,
    pub institute_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ReportQueryParams {
    /// 拆分为过滤条件与分页参数
    pub fn into_parts(self) -> (ReportFilter, Pagination) {
        let pagination = Pagination {
            page: self.page.unwrap_or(1).max(1),
            page_size: self.limit.unwrap_or(20).clamp(1, 100),
        };
        let filter = ReportFilter {
            search: self.search.filter(|s| !s.trim().is_empty()),
            report_type: self.report_type,
            format: self.format,
            status: self.status,
            institute_id: self.institute_id,
            student_id: self.student_id,
            subject_id: self.subject_id,
            course_id: self.course_id,
            package_id: self.package_id,
            test_id: self.test_id,
            start_date: self.start_date,
            end_date: self.end_date,
        };
        (filter, pagination)
    }
}

impl ReportFilter {
    /// 判断报告是否满足过滤条件（内存实现与测试使用）
    pub fn matches(&self, report: &Report) -> bool {
        let eq = |want: Option<Uuid>, have: Option<Uuid>| want.is_none() || want == have;

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = report.name.to_lowercase().contains(&needle);
            let in_desc = report
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_desc {
                return false;
            }
        }

        self.report_type.is_none_or(|t| t == report.report_type)
            && self.format.is_none_or(|f| f == report.format)
            && self.status.is_none_or(|s| s == report.status)
            && eq(self.institute_id, report.institute_id)
            && eq(self.student_id, report.student_id)
            && eq(self.subject_id, report.subject_id)
            && eq(self.course_id, report.course_id)
            && eq(self.package_id, report.package_id)
            && eq(self.test_id, report.test_id)
            && self.start_date.is_none_or(|d| report.created_at >= d)
            && self.end_date.is_none_or(|d| report.created_at <= d)
    }
}

/// 报告可见范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportVisibility {
    /// 管理员：全部可见
    All,
    /// 非管理员：本人创建或属于本机构
    Restricted {
        user_id: Uuid,
        institute_id: Option<Uuid>,
    },
}

impl ReportVisibility {
    pub fn allows(&self, report: &Report) -> bool {
        match self {
            ReportVisibility::All => true,
            ReportVisibility::Restricted {
                user_id,
                institute_id,
            } => {
                report.requested_by == *user_id
                    || (institute_id.is_some() && report.institute_id == *institute_id)
            }
        }
    }
}

/// 报告关联实体名称
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ScopeReferences {
    pub requester: Option<NamedRef>,
    pub institute: Option<NamedRef>,
    pub student: Option<NamedRef>,
    pub subject: Option<NamedRef>,
    pub course: Option<NamedRef>,
    pub package: Option<NamedRef>,
    pub test: Option<NamedRef>,
}

/// 报告详情（含关联实体）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportDetail {
    pub report: Report,
    pub references: ScopeReferences,
}

/// 报告类型说明
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportTypeInfo {
    pub value: ReportType,
    pub label: String,
    pub description: String,
    /// 必填的范围字段
    pub required_field: Option<String>,
}

/// 报告格式说明
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportFormatInfo {
    pub value: ReportFormat,
    pub label: String,
}

/// 报告类型列表响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportTypesResponse {
    pub report_types: Vec<ReportTypeInfo>,
    pub formats: Vec<ReportFormatInfo>,
}

impl ReportTypesResponse {
    /// 对外展示的类型与格式
    pub fn advertised() -> Self {
        Self {
            report_types: ReportType::ALL
                .iter()
                .filter(|t| t.is_advertised())
                .map(|t| ReportTypeInfo {
                    value: *t,
                    label: t.label().to_string(),
                    description: t.description().to_string(),
                    required_field: t.required_scope().map(|f| f.field_name().to_string()),
                })
                .collect(),
            formats: ReportFormat::ALL
                .iter()
                .filter(|f| f.is_advertised())
                .map(|f| ReportFormatInfo {
                    value: *f,
                    label: f.label().to_string(),
                })
                .collect(),
        }
    }
}
