use super::scope_id;
use crate::error::{AppError, AppResult};
use crate::models::{Report, ResultQuery};
use crate::reporting::accumulator::{GroupedScores, group_by_subject, group_by_test, summarize};
use crate::reporting::data::{InstituteCounts, InstituteReportData};
use crate::reporting::source::AcademicSource;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// 机构报告：学生、课程、测试计数与各维度成绩
pub async fn assemble(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<InstituteReportData> {
    let institute_id = scope_id(report)?;
    let institute = source
        .find_institute(institute_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("institute {}", institute_id)))?;

    let students = source.students_in_institute(institute_id).await?;
    let courses = source.courses_for_institute(institute_id).await?;

    let mut by_course = GroupedScores::new();
    let mut test_courses: HashMap<Uuid, Vec<usize>> = HashMap::new();
    let mut test_ids: HashSet<Uuid> = HashSet::new();
    for (index, course) in courses.iter().enumerate() {
        by_course.ensure(course.id, &course.name);
        for test in source.tests_for_course(course.id).await? {
            test_ids.insert(test.id);
            test_courses.entry(test.id).or_default().push(index);
        }
    }

    let results = source
        .find_results(
            &ResultQuery::between(report.date_from, report.date_to).institute(Some(institute_id)),
        )
        .await?;

    for result in &results {
        for index in test_courses.get(&result.test_id).into_iter().flatten() {
            let course = &courses[*index];
            by_course.record(course.id, &course.name, result);
        }
    }

    Ok(InstituteReportData {
        institute,
        counts: InstituteCounts {
            students: students.len(),
            courses: courses.len(),
            tests: test_ids.len(),
            attempts: results.len(),
        },
        summary: summarize(&results),
        course_performance: by_course.into_sorted(true),
        subject_performance: group_by_subject(&results),
        test_performance: group_by_test(&results),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportType;
    use crate::testing::{School, report_for};

    #[tokio::test]
    async fn test_institute_scoped_performance() {
        let school = School::build();
        let report = report_for(ReportType::Institute, &school);

        let data = assemble(&school.source, &report).await.unwrap();
        assert_eq!(data.institute.name, "North Academy");
        assert_eq!(
            data.counts,
            InstituteCounts {
                students: 3,
                courses: 1,
                tests: 2,
                attempts: 4,
            }
        );
        assert_eq!(data.summary.average_score, "64.00");
        assert_eq!(data.course_performance[0].average_score, "64.00");
        assert_eq!(data.course_performance[0].student_count, Some(2));

        let subjects: Vec<&str> = data
            .subject_performance
            .iter()
            .map(|g| g.average_score.as_str())
            .collect();
        assert_eq!(subjects, vec!["65.00", "60.00"]);
        assert_eq!(data.test_performance.len(), 2);
    }
}
