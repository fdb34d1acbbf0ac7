pub mod analytics;
pub mod report;

use crate::{
    config::Config, database::Database, reporting::AcademicSource, services::ReportOrchestrator,
    storage::Storage,
};
use std::sync::Arc;

pub use analytics::get_student_rank;
pub use report::{
    create_report, delete_report, get_report, get_report_types, list_reports, regenerate_report,
};

/// 应用状态
///
/// 依赖的外部服务不可用时对应字段为 None，相关接口返回错误而不是拒绝启动。
#[derive(Clone)]
pub struct AppState {
    pub database: Option<Database>,
    pub storage: Option<Arc<dyn Storage>>,
    pub reports: Option<ReportOrchestrator>,
    pub academic: Option<Arc<dyn AcademicSource>>,
    pub config: Config,
}

impl AppState {
    /// 报告服务
    pub fn reports(&self) -> crate::error::AppResult<&ReportOrchestrator> {
        self.reports
            .as_ref()
            .ok_or_else(|| crate::error::AppError::service_unavailable("报告服务不可用"))
    }

    /// 学业数据服务
    pub fn academic(&self) -> crate::error::AppResult<&dyn AcademicSource> {
        self.academic
            .as_deref()
            .ok_or_else(|| crate::error::AppError::service_unavailable("数据库服务不可用"))
    }
}
