//! 学生排名分析。

use super::accumulator::GroupedScores;
use super::source::AcademicSource;
use super::stats::{format_score, rank_percentile};
use crate::error::{AppError, AppResult};
use crate::models::ResultQuery;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// 排名范围
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct RankScope {
    pub subject_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
}

/// 学生排名
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentRank {
    pub student_id: Uuid,
    pub institute_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
    /// 学生在范围内的平均得分率
    pub score: String,
    /// 1 为最高分
    pub rank: usize,
    pub population_size: usize,
    /// 基于排名的百分位，数值越小越靠前
    pub percentile: u32,
}

/// 计算学生在同机构学生中的排名；未归属机构的学生与全平台比较
pub async fn student_rank(
    source: &dyn AcademicSource,
    student_id: Uuid,
    scope: RankScope,
) -> AppResult<StudentRank> {
    let student = source
        .find_user(student_id)
        .await?
        .filter(|u| u.is_student())
        .ok_or_else(|| AppError::not_found(format!("student {}", student_id)))?;

    let mut query = ResultQuery::default().institute(student.institute_id);
    if let Some(subject_id) = scope.subject_id {
        query = query.subject(subject_id);
    }
    if let Some(test_id) = scope.test_id {
        query = query.tests(vec![test_id]);
    }
    let results = source.find_results(&query).await?;

    let mut by_student = GroupedScores::new();
    for result in &results {
        by_student.record(result.student_id, &result.student_name, result);
    }
    let mut averages = by_student.averages();

    let score = averages.remove(&student_id).ok_or_else(|| {
        AppError::not_found(format!("results of student {} in the requested scope", student_id))
    })?;
    let population: Vec<f64> = averages.into_values().collect();
    let position = rank_percentile(&population, score);

    tracing::debug!(
        student_id = %student_id,
        rank = position.rank,
        population = position.population_size,
        "计算学生排名"
    );

    Ok(StudentRank {
        student_id,
        institute_id: student.institute_id,
        subject_id: scope.subject_id,
        test_id: scope.test_id,
        score: format_score(score),
        rank: position.rank,
        population_size: position.population_size,
        percentile: position.percentile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::School;

    #[tokio::test]
    async fn test_rank_within_institute() {
        let school = School::build();
        // North: Alice 53.33, Bob 80.00
        let rank = student_rank(&school.source, school.alice.id, RankScope::default())
            .await
            .unwrap();
        assert_eq!(rank.score, "53.33");
        assert_eq!(rank.rank, 2);
        assert_eq!(rank.population_size, 2);
        assert_eq!(rank.percentile, 100);

        let rank = student_rank(&school.source, school.bob.id, RankScope::default())
            .await
            .unwrap();
        assert_eq!(rank.rank, 1);
        assert_eq!(rank.percentile, 50);
    }

    #[tokio::test]
    async fn test_rank_for_single_test() {
        let school = School::build();
        let scope = RankScope {
            subject_id: None,
            test_id: Some(school.algebra.id),
        };
        let rank = student_rank(&school.source, school.bob.id, scope).await.unwrap();
        assert_eq!(rank.score, "80.00");
        assert_eq!(rank.rank, 1);
    }

    #[tokio::test]
    async fn test_student_without_results() {
        let school = School::build();
        let err = student_rank(&school.source, school.carol.id, RankScope::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
