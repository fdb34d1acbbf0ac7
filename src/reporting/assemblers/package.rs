use super::{narrowed_query, narrowing_institute, scope_id};
use crate::error::{AppError, AppResult};
use crate::models::Report;
use crate::reporting::accumulator::{GroupedScores, group_by_student, result_rows, summarize};
use crate::reporting::data::PackageReportData;
use crate::reporting::source::AcademicSource;
use std::collections::HashMap;
use uuid::Uuid;

/// 课程包报告：按课程（含学生数）和学生汇总
pub async fn assemble(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<PackageReportData> {
    let package_id = scope_id(report)?;
    let package = source
        .find_package(package_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("package {}", package_id)))?;
    let institute = narrowing_institute(source, report).await?;

    let courses = source.courses_in_package(package_id).await?;

    // 测试 → 所属课程（同一测试出现在多门课程时取第一门）
    let mut test_course: HashMap<Uuid, usize> = HashMap::new();
    let mut by_course = GroupedScores::new();
    for (index, course) in courses.iter().enumerate() {
        by_course.ensure(course.id, &course.name);
        for test in source.tests_for_course(course.id).await? {
            test_course.entry(test.id).or_insert(index);
        }
    }

    let test_ids: Vec<Uuid> = test_course.keys().copied().collect();
    let results = if test_ids.is_empty() {
        Vec::new()
    } else {
        source
            .find_results(&narrowed_query(report).tests(test_ids))
            .await?
    };

    for result in &results {
        if let Some(course) = test_course.get(&result.test_id).map(|i| &courses[*i]) {
            by_course.record(course.id, &course.name, result);
        }
    }

    Ok(PackageReportData {
        package,
        institute,
        course_count: courses.len(),
        test_count: test_course.len(),
        summary: summarize(&results),
        course_performance: by_course.into_sorted(true),
        student_performance: group_by_student(&results),
        results: result_rows(&results),
    })
}
