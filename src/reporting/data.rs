//! 各报告类型的数据结构。

use crate::models::{MarksSummary, NamedRef, OverallCounts};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 成绩汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// 作答次数（所有状态）
    pub total_tests: usize,
    /// 已完成次数
    pub completed_tests: usize,
    pub total_obtained: f64,
    pub total_marks: f64,
    /// 平均得分率（两位小数）
    pub average_score: String,
}

/// 分组成绩（科目/课程/测试/学生/机构）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPerformance {
    pub id: Uuid,
    pub name: String,
    pub total_attempts: usize,
    pub completed_attempts: usize,
    pub total_obtained: f64,
    pub total_marks: f64,
    pub average_score: String,
    /// 去重后的学生数（仅部分分组统计）
    pub student_count: Option<usize>,
}

/// 单条作答明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub result_id: Uuid,
    pub student_name: String,
    pub test_name: String,
    pub subject_name: Option<String>,
    pub status: String,
    pub marks: Option<MarksSummary>,
    /// 得分率或 "N/A"
    pub percentage: String,
    pub attempted_at: DateTime<Utc>,
}

/// 学生基本信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReportData {
    pub student: StudentInfo,
    pub institute: Option<NamedRef>,
    pub summary: ScoreSummary,
    pub subject_performance: Vec<GroupPerformance>,
    pub results: Vec<ResultRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectReportData {
    pub subject: NamedRef,
    pub institute: Option<NamedRef>,
    pub summary: ScoreSummary,
    pub test_performance: Vec<GroupPerformance>,
    pub results: Vec<ResultRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseReportData {
    pub course: NamedRef,
    pub institute: Option<NamedRef>,
    pub test_count: usize,
    pub summary: ScoreSummary,
    pub subject_performance: Vec<GroupPerformance>,
    pub student_performance: Vec<GroupPerformance>,
    pub results: Vec<ResultRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageReportData {
    pub package: NamedRef,
    pub institute: Option<NamedRef>,
    pub course_count: usize,
    pub test_count: usize,
    pub summary: ScoreSummary,
    pub course_performance: Vec<GroupPerformance>,
    pub student_performance: Vec<GroupPerformance>,
    pub results: Vec<ResultRow>,
}

/// 测试基本信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestInfo {
    pub id: Uuid,
    pub name: String,
    pub subject_name: Option<String>,
    pub total_marks: f64,
}

/// 单题统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStat {
    pub question_id: Uuid,
    pub question: String,
    pub attempts: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// 平均用时（秒，两位小数）
    pub average_time: String,
}

/// 单个学生的测试成绩
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentTestRow {
    pub student_id: Uuid,
    pub student_name: String,
    pub status: String,
    pub score: Option<f64>,
    pub total: Option<f64>,
    pub percentage: String,
    pub correct: i32,
    pub incorrect: i32,
    /// 每题平均用时（秒，两位小数）
    pub average_time_per_question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReportData {
    pub test: TestInfo,
    pub institute: Option<NamedRef>,
    pub summary: ScoreSummary,
    pub question_analysis: Vec<QuestionStat>,
    pub student_results: Vec<StudentTestRow>,
}

/// 机构计数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstituteCounts {
    pub students: usize,
    pub courses: usize,
    pub tests: usize,
    pub attempts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstituteReportData {
    pub institute: NamedRef,
    pub counts: InstituteCounts,
    pub summary: ScoreSummary,
    pub course_performance: Vec<GroupPerformance>,
    pub subject_performance: Vec<GroupPerformance>,
    pub test_performance: Vec<GroupPerformance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallReportData {
    pub counts: OverallCounts,
    pub summary: ScoreSummary,
    pub subject_performance: Vec<GroupPerformance>,
    pub test_performance: Vec<GroupPerformance>,
    pub institute_performance: Vec<GroupPerformance>,
}

/// 按报告类型组装出的数据
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportData {
    Student(StudentReportData),
    Subject(SubjectReportData),
    Course(CourseReportData),
    Package(PackageReportData),
    Test(TestReportData),
    Institute(InstituteReportData),
    Overall(OverallReportData),
}

impl ReportData {
    pub fn summary(&self) -> &ScoreSummary {
        match self {
            ReportData::Student(d) => &d.summary,
            ReportData::Subject(d) => &d.summary,
            ReportData::Course(d) => &d.summary,
            ReportData::Package(d) => &d.summary,
            ReportData::Test(d) => &d.summary,
            ReportData::Institute(d) => &d.summary,
            ReportData::Overall(d) => &d.summary,
        }
    }
}
