use super::{narrowed_query, narrowing_institute, scope_id};
use crate::error::{AppError, AppResult};
use crate::models::Report;
use crate::reporting::accumulator::{group_by_student, group_by_subject, result_rows, summarize};
use crate::reporting::data::CourseReportData;
use crate::reporting::source::AcademicSource;
use uuid::Uuid;

/// 课程报告：主题树下的全部测试，按科目和学生汇总
pub async fn assemble(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<CourseReportData> {
    let course_id = scope_id(report)?;
    let course = source
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("course {}", course_id)))?;
    let institute = narrowing_institute(source, report).await?;

    let tests = source.tests_for_course(course_id).await?;
    let test_ids: Vec<Uuid> = tests.iter().map(|t| t.id).collect();

    let results = if test_ids.is_empty() {
        Vec::new()
    } else {
        source
            .find_results(&narrowed_query(report).tests(test_ids))
            .await?
    };

    Ok(CourseReportData {
        course,
        institute,
        test_count: tests.len(),
        summary: summarize(&results),
        subject_performance: group_by_subject(&results),
        student_performance: group_by_student(&results),
        results: result_rows(&results),
    })
}
