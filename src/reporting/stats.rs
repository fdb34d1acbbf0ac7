//! 成绩统计的公共计算规则。

use crate::models::MarksSummary;

/// 排名查找时的浮点容差
pub const SCORE_EPSILON: f64 = 0.001;

/// 缺少成绩时的占位值
pub const NOT_AVAILABLE: &str = "N/A";

/// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 平均得分率 = Σ得分 / Σ总分 × 100，总分为0时返回0
pub fn average_percentage(obtained: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        round2(obtained / total * 100.0)
    }
}

/// 格式化为两位小数字符串
pub fn format_score(value: f64) -> String {
    format!("{:.2}", value)
}

/// 单条成绩的得分率，缺少成绩时返回 "N/A"
pub fn row_percentage(marks: Option<&MarksSummary>) -> String {
    match marks {
        Some(m) => format_score(average_percentage(m.obtained_marks, m.total_marks)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// 排名位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankPosition {
    /// 从1开始，1为最高分
    pub rank: usize,
    /// 含目标分数在内的总体人数
    pub population_size: usize,
    /// round(rank / population_size × 100)，数值越小排名越靠前
    pub percentile: u32,
}

/// 计算基于排名的百分位。
///
/// 目标分数追加进总体后降序排列，按 |a-b| < SCORE_EPSILON 查找首个位置。
pub fn rank_percentile(population: &[f64], score: f64) -> RankPosition {
    let mut scores = population.to_vec();
    scores.push(score);
    scores.sort_by(|a, b| b.total_cmp(a));

    let position = scores
        .iter()
        .position(|s| (s - score).abs() < SCORE_EPSILON)
        .unwrap_or(scores.len() - 1);

    let rank = position + 1;
    let population_size = scores.len();
    let percentile = ((rank as f64 / population_size as f64) * 100.0).round() as u32;

    RankPosition {
        rank,
        population_size,
        percentile,
    }
}
