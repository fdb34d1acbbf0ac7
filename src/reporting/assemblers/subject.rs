use super::{narrowed_query, narrowing_institute, scope_id};
use crate::error::{AppError, AppResult};
use crate::models::Report;
use crate::reporting::accumulator::{group_by_test, result_rows, summarize};
use crate::reporting::data::SubjectReportData;
use crate::reporting::source::AcademicSource;

/// 科目报告：按测试汇总
pub async fn assemble(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<SubjectReportData> {
    let subject_id = scope_id(report)?;
    let subject = source
        .find_subject(subject_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("subject {}", subject_id)))?;
    let institute = narrowing_institute(source, report).await?;

    let results = source
        .find_results(&narrowed_query(report).subject(subject_id))
        .await?;

    Ok(SubjectReportData {
        subject,
        institute,
        summary: summarize(&results),
        test_performance: group_by_test(&results),
        results: result_rows(&results),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportType;
    use crate::testing::{School, report_for};

    #[tokio::test]
    async fn test_subject_groups_by_test() {
        let school = School::build();
        let report = report_for(ReportType::Subject, &school);

        let data = assemble(&school.source, &report).await.unwrap();
        assert_eq!(data.subject.name, "Mathematics");
        // Alice 50/100 + Bob 80/100 + Dan 90/100
        assert_eq!(data.summary.total_tests, 3);
        assert_eq!(data.summary.average_score, "73.33");
        assert_eq!(data.test_performance.len(), 1);
        assert_eq!(data.test_performance[0].name, "Algebra Quiz");
        assert_eq!(data.test_performance[0].student_count, Some(3));
    }

    #[tokio::test]
    async fn test_subject_narrowed_by_institute() {
        let school = School::build();
        let mut report = report_for(ReportType::Subject, &school);
        report.institute_id = Some(school.institute.id);

        let data = assemble(&school.source, &report).await.unwrap();
        assert_eq!(data.institute.unwrap().name, "North Academy");
        assert_eq!(data.summary.total_tests, 2);
        assert_eq!(data.summary.average_score, "65.00");
    }
}
