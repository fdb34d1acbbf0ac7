//! 按实体ID累加成绩，最后转换为有序列表。

use super::data::{GroupPerformance, ResultRow, ScoreSummary};
use super::stats::{average_percentage, format_score, round2, row_percentage};
use crate::models::ResultRecord;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// 成绩累加器
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    attempts: usize,
    completed: usize,
    obtained: f64,
    total: f64,
    students: HashSet<Uuid>,
}

impl ScoreAccumulator {
    pub fn record(&mut self, result: &ResultRecord) {
        self.attempts += 1;
        if result.is_completed() {
            self.completed += 1;
        }
        if let Some(marks) = &result.marks {
            self.obtained += marks.obtained_marks;
            self.total += marks.total_marks;
        }
        self.students.insert(result.student_id);
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn average(&self) -> f64 {
        average_percentage(self.obtained, self.total)
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            total_tests: self.attempts,
            completed_tests: self.completed,
            total_obtained: round2(self.obtained),
            total_marks: round2(self.total),
            average_score: format_score(self.average()),
        }
    }
}

/// 汇总一组作答
pub fn summarize(results: &[ResultRecord]) -> ScoreSummary {
    let mut acc = ScoreAccumulator::default();
    for result in results {
        acc.record(result);
    }
    acc.summary()
}

/// 分组累加（实体ID → 累加器）
#[derive(Debug, Default)]
pub struct GroupedScores {
    groups: HashMap<Uuid, (String, ScoreAccumulator)>,
}

impl GroupedScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先登记分组，没有作答的分组也会出现在结果中
    pub fn ensure(&mut self, id: Uuid, name: &str) {
        self.groups
            .entry(id)
            .or_insert_with(|| (name.to_string(), ScoreAccumulator::default()));
    }

    pub fn record(&mut self, id: Uuid, name: &str, result: &ResultRecord) {
        self.groups
            .entry(id)
            .or_insert_with(|| (name.to_string(), ScoreAccumulator::default()))
            .1
            .record(result);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 每个分组的平均得分率
    pub fn averages(&self) -> HashMap<Uuid, f64> {
        self.groups
            .iter()
            .map(|(id, (_, acc))| (*id, acc.average()))
            .collect()
    }

    /// 按名称（再按ID）排序输出
    pub fn into_sorted(self, with_student_count: bool) -> Vec<GroupPerformance> {
        let mut list: Vec<GroupPerformance> = self
            .groups
            .into_iter()
            .map(|(id, (name, acc))| GroupPerformance {
                id,
                name,
                total_attempts: acc.attempts,
                completed_attempts: acc.completed,
                total_obtained: round2(acc.obtained),
                total_marks: round2(acc.total),
                average_score: format_score(acc.average()),
                student_count: with_student_count.then_some(acc.students.len()),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        list
    }
}

/// 按科目分组（无科目的作答不参与分组）
pub fn group_by_subject(results: &[ResultRecord]) -> Vec<GroupPerformance> {
    let mut groups = GroupedScores::new();
    for result in results {
        if let Some(subject_id) = result.subject_id {
            let name = result.subject_name.as_deref().unwrap_or("Unnamed subject");
            groups.record(subject_id, name, result);
        }
    }
    groups.into_sorted(false)
}

/// 按测试分组
pub fn group_by_test(results: &[ResultRecord]) -> Vec<GroupPerformance> {
    let mut groups = GroupedScores::new();
    for result in results {
        groups.record(result.test_id, &result.test_name, result);
    }
    groups.into_sorted(true)
}

/// 按学生分组
pub fn group_by_student(results: &[ResultRecord]) -> Vec<GroupPerformance> {
    let mut groups = GroupedScores::new();
    for result in results {
        groups.record(result.student_id, &result.student_name, result);
    }
    groups.into_sorted(false)
}

/// 作答明细，按时间倒序
pub fn result_rows(results: &[ResultRecord]) -> Vec<ResultRow> {
    let mut rows: Vec<ResultRow> = results
        .iter()
        .map(|r| ResultRow {
            result_id: r.id,
            student_name: r.student_name.clone(),
            test_name: r.test_name.clone(),
            subject_name: r.subject_name.clone(),
            status: r.status.as_str().to_string(),
            marks: r.marks,
            percentage: row_percentage(r.marks.as_ref()),
            attempted_at: r.created_at,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.attempted_at
            .cmp(&a.attempted_at)
            .then(a.result_id.cmp(&b.result_id))
    });
    rows
}
