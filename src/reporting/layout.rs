//! 报告文档的固定版式：每种报告类型对应固定的章节、工作表与列。
//!
//! PDF 与表格两种渲染器共用同一份版式。

use super::data::{GroupPerformance, ReportData, ResultRow, ScoreSummary};
use crate::models::{NamedRef, Report};
use chrono::{DateTime, Utc};
use std::fmt;

/// 空集合的占位文本
pub const NO_DATA: &str = "No data available";

/// 单元格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn optional(value: Option<&str>) -> Self {
        Cell::Text(value.unwrap_or("N/A").to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.fract() == 0.0 => write!(f, "{:.0}", n),
            Cell::Number(n) => write!(f, "{:.2}", n),
        }
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// 章节内容
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    /// 键值信息块
    Fields(Vec<(&'static str, Cell)>),
    /// 固定表头的表格
    Table {
        headers: Vec<&'static str>,
        rows: Vec<Vec<Cell>>,
    },
}

/// 文档章节
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// 所属工作表名称
    pub sheet: &'static str,
    pub title: &'static str,
    pub body: SectionBody,
}

/// 文档版式
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub title: String,
    pub subtitle: &'static str,
    pub description: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<Section>,
}

const SUMMARY_SHEET: &str = "Summary";

impl DocumentLayout {
    pub fn build(data: &ReportData, report: &Report, generated_at: DateTime<Utc>) -> Self {
        let sections = match data {
            ReportData::Student(d) => vec![
                fields(
                    "Student Information",
                    vec![
                        ("Name", Cell::text(&d.student.name)),
                        ("Email", Cell::text(&d.student.email)),
                        ("Institute", institute_cell(d.institute.as_ref())),
                    ],
                ),
                summary_fields(&d.summary),
                group_table(
                    "Subject Performance",
                    "Subject Performance",
                    "Subject",
                    &d.subject_performance,
                    false,
                ),
                result_table("Test Results", "Test Results", &d.results),
            ],
            ReportData::Subject(d) => vec![
                fields(
                    "Subject Information",
                    vec![
                        ("Subject", Cell::text(&d.subject.name)),
                        ("Institute", institute_cell(d.institute.as_ref())),
                    ],
                ),
                summary_fields(&d.summary),
                group_table(
                    "Test Performance",
                    "Test Performance",
                    "Test",
                    &d.test_performance,
                    true,
                ),
                result_table("Results", "Student Results", &d.results),
            ],
            ReportData::Course(d) => vec![
                fields(
                    "Course Information",
                    vec![
                        ("Course", Cell::text(&d.course.name)),
                        ("Institute", institute_cell(d.institute.as_ref())),
                        ("Tests", d.test_count.into()),
                    ],
                ),
                summary_fields(&d.summary),
                group_table(
                    "Subject Performance",
                    "Subject Performance",
                    "Subject",
                    &d.subject_performance,
                    false,
                ),
                group_table(
                    "Student Performance",
                    "Student Performance",
                    "Student",
                    &d.student_performance,
                    false,
                ),
                result_table("Results", "Test Results", &d.results),
            ],
            ReportData::Package(d) => vec![
                fields(
                    "Package Information",
                    vec![
                        ("Package", Cell::text(&d.package.name)),
                        ("Institute", institute_cell(d.institute.as_ref())),
                        ("Courses", d.course_count.into()),
                        ("Tests", d.test_count.into()),
                    ],
                ),
                summary_fields(&d.summary),
                group_table(
                    "Course Performance",
                    "Course Performance",
                    "Course",
                    &d.course_performance,
                    true,
                ),
                group_table(
                    "Student Performance",
                    "Student Performance",
                    "Student",
                    &d.student_performance,
                    false,
                ),
                result_table("Results", "Test Results", &d.results),
            ],
            ReportData::Test(d) => vec![
                fields(
                    "Test Information",
                    vec![
                        ("Test", Cell::text(&d.test.name)),
                        ("Subject", Cell::optional(d.test.subject_name.as_deref())),
                        ("Total Marks", d.test.total_marks.into()),
                        ("Institute", institute_cell(d.institute.as_ref())),
                    ],
                ),
                summary_fields(&d.summary),
                Section {
                    sheet: "Question Analysis",
                    title: "Question Analysis",
                    body: SectionBody::Table {
                        headers: vec!["Question", "Attempts", "Correct", "Incorrect", "Avg Time (s)"],
                        rows: d
                            .question_analysis
                            .iter()
                            .map(|q| {
                                vec![
                                    Cell::text(&q.question),
                                    q.attempts.into(),
                                    q.correct.into(),
                                    q.incorrect.into(),
                                    Cell::text(&q.average_time),
                                ]
                            })
                            .collect(),
                    },
                },
                Section {
                    sheet: "Student Results",
                    title: "Student Results",
                    body: SectionBody::Table {
                        headers: vec![
                            "Student",
                            "Status",
                            "Score",
                            "Total",
                            "Percentage",
                            "Correct",
                            "Incorrect",
                            "Avg Time/Q (s)",
                        ],
                        rows: d
                            .student_results
                            .iter()
                            .map(|r| {
                                vec![
                                    Cell::text(&r.student_name),
                                    Cell::text(&r.status),
                                    marks_cell(r.score),
                                    marks_cell(r.total),
                                    Cell::text(&r.percentage),
                                    (r.correct as i64).into(),
                                    (r.incorrect as i64).into(),
                                    Cell::text(&r.average_time_per_question),
                                ]
                            })
                            .collect(),
                    },
                },
            ],
            ReportData::Institute(d) => vec![
                fields(
                    "Institute Information",
                    vec![
                        ("Institute", Cell::text(&d.institute.name)),
                        ("Students", d.counts.students.into()),
                        ("Courses", d.counts.courses.into()),
                        ("Tests", d.counts.tests.into()),
                        ("Attempts", d.counts.attempts.into()),
                    ],
                ),
                summary_fields(&d.summary),
                group_table(
                    "Course Performance",
                    "Course Performance",
                    "Course",
                    &d.course_performance,
                    true,
                ),
                group_table(
                    "Subject Performance",
                    "Subject Performance",
                    "Subject",
                    &d.subject_performance,
                    false,
                ),
                group_table(
                    "Test Performance",
                    "Test Performance",
                    "Test",
                    &d.test_performance,
                    true,
                ),
            ],
            ReportData::Overall(d) => vec![
                fields(
                    "Platform Overview",
                    vec![
                        ("Institutes", d.counts.institutes.into()),
                        ("Students", d.counts.students.into()),
                        ("Courses", d.counts.courses.into()),
                        ("Tests", d.counts.tests.into()),
                        ("Attempts", d.counts.attempts.into()),
                    ],
                ),
                summary_fields(&d.summary),
                group_table(
                    "Subject Performance",
                    "Subject Performance",
                    "Subject",
                    &d.subject_performance,
                    false,
                ),
                group_table(
                    "Test Performance",
                    "Test Performance",
                    "Test",
                    &d.test_performance,
                    true,
                ),
                group_table(
                    "Institute Performance",
                    "Institute Performance",
                    "Institute",
                    &d.institute_performance,
                    true,
                ),
            ],
        };

        Self {
            title: report.name.clone(),
            subtitle: report.report_type.label(),
            description: report.description.clone(),
            generated_at,
            sections,
        }
    }

    /// 按出现顺序列出工作表名称（去重）
    pub fn sheets(&self) -> Vec<&'static str> {
        let mut sheets: Vec<&'static str> = Vec::new();
        for section in &self.sections {
            if !sheets.contains(&section.sheet) {
                sheets.push(section.sheet);
            }
        }
        sheets
    }

    /// 页眉中的生成时间
    pub fn generated_label(&self) -> String {
        format!(
            "Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

fn fields(title: &'static str, entries: Vec<(&'static str, Cell)>) -> Section {
    Section {
        sheet: SUMMARY_SHEET,
        title,
        body: SectionBody::Fields(entries),
    }
}

fn summary_fields(summary: &ScoreSummary) -> Section {
    fields(
        "Performance Summary",
        vec![
            ("Total Tests", summary.total_tests.into()),
            ("Completed Tests", summary.completed_tests.into()),
            ("Marks Obtained", summary.total_obtained.into()),
            ("Total Marks", summary.total_marks.into()),
            ("Average Score (%)", Cell::text(&summary.average_score)),
        ],
    )
}

fn institute_cell(institute: Option<&NamedRef>) -> Cell {
    Cell::optional(institute.map(|i| i.name.as_str()))
}

fn marks_cell(value: Option<f64>) -> Cell {
    value.map(Cell::Number).unwrap_or_else(|| Cell::text("N/A"))
}

fn group_table(
    sheet: &'static str,
    title: &'static str,
    name_header: &'static str,
    groups: &[GroupPerformance],
    with_students: bool,
) -> Section {
    let mut headers = vec![name_header, "Attempts", "Completed", "Obtained", "Total"];
    if with_students {
        headers.push("Students");
    }
    headers.push("Average %");

    let rows = groups
        .iter()
        .map(|g| {
            let mut row = vec![
                Cell::text(&g.name),
                g.total_attempts.into(),
                g.completed_attempts.into(),
                g.total_obtained.into(),
                g.total_marks.into(),
            ];
            if with_students {
                row.push(g.student_count.unwrap_or(0).into());
            }
            row.push(Cell::text(&g.average_score));
            row
        })
        .collect();

    Section {
        sheet,
        title,
        body: SectionBody::Table { headers, rows },
    }
}

fn result_table(sheet: &'static str, title: &'static str, results: &[ResultRow]) -> Section {
    Section {
        sheet,
        title,
        body: SectionBody::Table {
            headers: vec![
                "Student",
                "Test",
                "Subject",
                "Status",
                "Score",
                "Total",
                "Percentage",
                "Date",
            ],
            rows: results
                .iter()
                .map(|r| {
                    vec![
                        Cell::text(&r.student_name),
                        Cell::text(&r.test_name),
                        Cell::optional(r.subject_name.as_deref()),
                        Cell::text(&r.status),
                        marks_cell(r.marks.map(|m| m.obtained_marks)),
                        marks_cell(r.marks.map(|m| m.total_marks)),
                        Cell::text(&r.percentage),
                        Cell::text(r.attempted_at.format("%Y-%m-%d").to_string()),
                    ]
                })
                .collect(),
        },
    }
}
