use super::scope_id;
use crate::error::{AppError, AppResult};
use crate::models::{Report, ResultQuery};
use crate::reporting::accumulator::{group_by_subject, result_rows, summarize};
use crate::reporting::data::{StudentInfo, StudentReportData};
use crate::reporting::source::AcademicSource;

/// 学生报告：全部作答、按科目汇总、逐条明细
pub async fn assemble(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<StudentReportData> {
    let student_id = scope_id(report)?;
    let student = source
        .find_user(student_id)
        .await?
        .filter(|u| u.is_student())
        .ok_or_else(|| AppError::not_found(format!("student {}", student_id)))?;

    let institute = match student.institute_id {
        Some(id) => source.find_institute(id).await?,
        None => None,
    };

    let mut query = ResultQuery::between(report.date_from, report.date_to).student(student_id);
    if let Some(subject_id) = report.subject_id {
        query = query.subject(subject_id);
    }
    let results = source.find_results(&query).await?;

    tracing::debug!(
        report_id = %report.id,
        student_id = %student_id,
        "学生报告共 {} 条作答",
        results.len()
    );

    Ok(StudentReportData {
        student: StudentInfo {
            id: student.id,
            name: student.name,
            email: student.email,
        },
        institute,
        summary: summarize(&results),
        subject_performance: group_by_subject(&results),
        results: result_rows(&results),
    })
}
