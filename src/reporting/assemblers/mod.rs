//! 按报告类型组装数据。
//!
//! 每个组装函数读取报告的范围字段与时间范围，返回对应类型的数据结构。

pub mod course;
pub mod institute;
pub mod overall;
pub mod package;
pub mod student;
pub mod subject;

use super::data::ReportData;
use super::source::AcademicSource;
use crate::error::{AppError, AppResult};
use crate::models::{NamedRef, Report, ReportType, ResultQuery};
use uuid::Uuid;

/// 根据报告类型分派到对应的组装函数
pub async fn assemble(source: &dyn AcademicSource, report: &Report) -> AppResult<ReportData> {
    tracing::debug!(
        report_id = %report.id,
        report_type = %report.report_type,
        "开始组装报告数据"
    );

    let data = match report.report_type {
        ReportType::Student => ReportData::Student(student::assemble(source, report).await?),
        ReportType::Subject => ReportData::Subject(subject::assemble(source, report).await?),
        ReportType::Course => ReportData::Course(course::assemble(source, report).await?),
        ReportType::Package => ReportData::Package(package::assemble(source, report).await?),
        ReportType::Test => ReportData::Test(test::assemble(source, report).await?),
        ReportType::Institute => {
            ReportData::Institute(institute::assemble(source, report).await?)
        }
        ReportType::Overall => ReportData::Overall(overall::assemble(source, report).await?),
    };

    Ok(data)
}

/// 报告类型要求的范围ID
fn scope_id(report: &Report) -> AppResult<Uuid> {
    report.required_scope_id()?.ok_or_else(|| {
        AppError::validation(format!("{} reports have no scope", report.report_type))
    })
}

/// 报告时间范围内的查询条件，附带可选的机构限定
fn narrowed_query(report: &Report) -> ResultQuery {
    ResultQuery::between(report.date_from, report.date_to).institute(report.institute_id)
}

/// 解析报告上附带的机构（仅作限定时使用）
async fn narrowing_institute(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<Option<NamedRef>> {
    match report.institute_id {
        Some(id) => Ok(Some(
            source
                .find_institute(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("institute {}", id)))?,
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{School, report_for};

    #[tokio::test]
    async fn test_dispatch_matches_report_type() {
        let school = School::build();
        for report_type in ReportType::ALL {
            let report = report_for(report_type, &school);
            let data = assemble(&school.source, &report).await.unwrap();
            let matched = matches!(
                (report_type, &data),
                (ReportType::Student, ReportData::Student(_))
                    | (ReportType::Subject, ReportData::Subject(_))
                    | (ReportType::Course, ReportData::Course(_))
                    | (ReportType::Package, ReportData::Package(_))
                    | (ReportType::Test, ReportData::Test(_))
                    | (ReportType::Institute, ReportData::Institute(_))
                    | (ReportType::Overall, ReportData::Overall(_))
            );
            assert!(matched, "{} 报告数据类型不匹配", report_type);
        }
    }

    #[tokio::test]
    async fn test_missing_scope_fails_validation() {
        let school = School::build();
        let mut report = report_for(ReportType::Course, &school);
        report.course_id = None;
        let err = assemble(&school.source, &report).await.unwrap_err();
        assert!(err.to_string().contains("course_id is required for course reports"));
    }
}
