use crate::error::AppResult;
use crate::models::{Report, ResultQuery};
use crate::reporting::accumulator::{GroupedScores, group_by_subject, group_by_test, summarize};
use crate::reporting::data::OverallReportData;
use crate::reporting::source::AcademicSource;
use uuid::Uuid;

/// 未归属机构的作答统一记在该分组下
const UNKNOWN_INSTITUTE: &str = "Unassigned";

/// 全局报告：平台计数与科目、测试、机构成绩
pub async fn assemble(
    source: &dyn AcademicSource,
    report: &Report,
) -> AppResult<OverallReportData> {
    let counts = source.overall_counts().await?;
    let institutes = source.list_institutes().await?;
    let results = source
        .find_results(&ResultQuery::between(report.date_from, report.date_to))
        .await?;

    let mut by_institute = GroupedScores::new();
    for institute in &institutes {
        by_institute.ensure(institute.id, &institute.name);
    }
    for result in &results {
        let known = result
            .institute_id
            .and_then(|id| institutes.iter().find(|i| i.id == id));
        match known {
            Some(institute) => by_institute.record(institute.id, &institute.name, result),
            None => by_institute.record(Uuid::nil(), UNKNOWN_INSTITUTE, result),
        }
    }

    Ok(OverallReportData {
        counts,
        summary: summarize(&results),
        subject_performance: group_by_subject(&results),
        test_performance: group_by_test(&results),
        institute_performance: by_institute.into_sorted(true),
    })
}
