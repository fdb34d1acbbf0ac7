use super::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// 实体引用（ID + 名称）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

/// 测试结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "result_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// 已完成作答
    Finished,
    /// 未完成
    NotFinished,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Finished => "finished",
            ResultStatus::NotFinished => "not_finished",
        }
    }
}

/// 成绩摘要
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarksSummary {
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub correct: i32,
    pub incorrect: i32,
    pub skipped: i32,
}

/// 学生的一次测试作答（只读，含关联名称）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub institute_id: Option<Uuid>,
    pub test_id: Uuid,
    pub test_name: String,
    pub subject_id: Option<Uuid>,
    pub subject_name: Option<String>,
    pub status: ResultStatus,
    pub marks: Option<MarksSummary>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn is_completed(&self) -> bool {
        self.status == ResultStatus::Finished
    }
}

/// 单题作答结果
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionResultRecord {
    pub result_id: Uuid,
    pub question_id: Uuid,
    pub question_text: Option<String>,
    pub attempted: bool,
    pub is_correct: bool,
    pub time_taken_secs: f64,
}

/// 用户
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub institute_id: Option<Uuid>,
}

impl UserRecord {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

/// 测试
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestRecord {
    pub id: Uuid,
    pub name: String,
    pub subject_id: Option<Uuid>,
    pub subject_name: Option<String>,
    pub total_marks: f64,
}

/// 全局计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OverallCounts {
    pub institutes: i64,
    pub students: i64,
    pub courses: i64,
    pub tests: i64,
    pub attempts: i64,
}

/// 结果查询条件
#[derive(Debug, Clone, Default)]
pub struct ResultQuery {
    pub student_id: Option<Uuid>,
    pub institute_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub test_ids: Option<Vec<Uuid>>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl ResultQuery {
    pub fn between(date_from: Option<DateTime<Utc>>, date_to: Option<DateTime<Utc>>) -> Self {
        Self {
            date_from,
            date_to,
            ..Default::default()
        }
    }

    pub fn student(mut self, student_id: Uuid) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn institute(mut self, institute_id: Option<Uuid>) -> Self {
        self.institute_id = institute_id;
        self
    }

    pub fn subject(mut self, subject_id: Uuid) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    pub fn tests(mut self, test_ids: Vec<Uuid>) -> Self {
        self.test_ids = Some(test_ids);
        self
    }

    /// 判断结果是否满足条件（内存实现与测试使用）
    pub fn matches(&self, result: &ResultRecord) -> bool {
        self.student_id.is_none_or(|id| id == result.student_id)
            && self
                .institute_id
                .is_none_or(|id| result.institute_id == Some(id))
            && self
                .subject_id
                .is_none_or(|id| result.subject_id == Some(id))
            && self
                .test_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&result.test_id))
            && self.date_from.is_none_or(|d| result.created_at >= d)
            && self.date_to.is_none_or(|d| result.created_at <= d)
    }
}
