use crate::{
    database::Database,
    error::AppResult,
    models::{
        MarksSummary, NamedRef, OverallCounts, QuestionResultRecord, ResultQuery, ResultRecord,
        ResultStatus, Role, TestRecord, UserRecord,
    },
    reporting::AcademicSource,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

/// 作答记录查询行
#[derive(Debug, FromRow)]
struct ResultRow {
    id: Uuid,
    student_id: Uuid,
    student_name: String,
    institute_id: Option<Uuid>,
    test_id: Uuid,
    test_name: String,
    subject_id: Option<Uuid>,
    subject_name: Option<String>,
    status: ResultStatus,
    obtained_marks: Option<f64>,
    total_marks: Option<f64>,
    correct: i32,
    incorrect: i32,
    skipped: i32,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ResultRow> for ResultRecord {
    fn from(row: ResultRow) -> Self {
        // 得分与总分同时存在才视为有成绩
        let marks = match (row.obtained_marks, row.total_marks) {
            (Some(obtained_marks), Some(total_marks)) => Some(MarksSummary {
                obtained_marks,
                total_marks,
                correct: row.correct,
                incorrect: row.incorrect,
                skipped: row.skipped,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            institute_id: row.institute_id,
            test_id: row.test_id,
            test_name: row.test_name,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            status: row.status,
            marks,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
        }
    }
}

/// 学业数据仓库（只读）
#[derive(Clone)]
pub struct AcademicRepository {
    db: Database,
}

impl AcademicRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn find_named(&self, table: &str, id: Uuid) -> AppResult<Option<NamedRef>> {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1", table);
        let found = sqlx::query_as::<_, NamedRef>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(found)
    }
}

#[async_trait]
impl AcademicSource for AcademicRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, role, institute_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(user)
    }

    async fn find_institute(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        self.find_named("institutes", id).await
    }

    async fn find_subject(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        self.find_named("subjects", id).await
    }

    async fn find_course(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        self.find_named("courses", id).await
    }

    async fn find_package(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        self.find_named("packages", id).await
    }

    async fn find_test(&self, id: Uuid) -> AppResult<Option<TestRecord>> {
        let test = sqlx::query_as::<_, TestRecord>(
            r#"
            SELECT t.id, t.name, t.subject_id, s.name AS subject_name, t.total_marks
            FROM tests t
            LEFT JOIN subjects s ON s.id = t.subject_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(test)
    }

    async fn find_results(&self, query: &ResultQuery) -> AppResult<Vec<ResultRecord>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                r.id, r.student_id, u.name AS student_name, u.institute_id,
                r.test_id, t.name AS test_name, t.subject_id, s.name AS subject_name,
                r.status, r.obtained_marks, r.total_marks, r.correct, r.incorrect, r.skipped,
                r.started_at, r.finished_at, r.created_at
            FROM results r
            JOIN users u ON u.id = r.student_id
            JOIN tests t ON t.id = r.test_id
            LEFT JOIN subjects s ON s.id = t.subject_id
            WHERE 1=1
            "#,
        );

        if let Some(student_id) = query.student_id {
            builder.push(" AND r.student_id = ");
            builder.push_bind(student_id);
        }
        if let Some(institute_id) = query.institute_id {
            builder.push(" AND u.institute_id = ");
            builder.push_bind(institute_id);
        }
        if let Some(subject_id) = query.subject_id {
            builder.push(" AND t.subject_id = ");
            builder.push_bind(subject_id);
        }
        if let Some(test_ids) = &query.test_ids {
            builder.push(" AND r.test_id = ANY(");
            builder.push_bind(test_ids.clone());
            builder.push(")");
        }
        if let Some(from) = query.date_from {
            builder.push(" AND r.created_at >= ");
            builder.push_bind(from);
        }
        if let Some(to) = query.date_to {
            builder.push(" AND r.created_at <= ");
            builder.push_bind(to);
        }
        builder.push(" ORDER BY r.created_at DESC, r.id");

        let rows = builder
            .build_query_as::<ResultRow>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(ResultRecord::from).collect())
    }

    async fn find_question_results(
        &self,
        result_ids: &[Uuid],
    ) -> AppResult<Vec<QuestionResultRecord>> {
        let rows = sqlx::query_as::<_, QuestionResultRecord>(
            r#"
            SELECT qr.result_id, qr.question_id, q.text AS question_text,
                   qr.attempted, qr.is_correct, qr.time_taken_secs
            FROM question_results qr
            LEFT JOIN questions q ON q.id = qr.question_id
            WHERE qr.result_id = ANY($1)
            "#,
        )
        .bind(result_ids.to_vec())
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    async fn tests_for_course(&self, course_id: Uuid) -> AppResult<Vec<TestRecord>> {
        // 沿主题树向下收集课程的全部主题
        let tests = sqlx::query_as::<_, TestRecord>(
            r#"
            WITH RECURSIVE course_topics AS (
                SELECT id FROM topics WHERE course_id = $1
                UNION
                SELECT tp.id FROM topics tp
                JOIN course_topics ct ON tp.parent_id = ct.id
            )
            SELECT DISTINCT t.id, t.name, t.subject_id, s.name AS subject_name, t.total_marks
            FROM tests t
            JOIN course_topics ct ON t.topic_id = ct.id
            LEFT JOIN subjects s ON s.id = t.subject_id
            ORDER BY t.name, t.id
            "#,
        )
        .bind(course_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(tests)
    }

    async fn courses_in_package(&self, package_id: Uuid) -> AppResult<Vec<NamedRef>> {
        let courses = sqlx::query_as::<_, NamedRef>(
            r#"
            SELECT c.id, c.name
            FROM courses c
            JOIN package_courses pc ON pc.course_id = c.id
            WHERE pc.package_id = $1
            ORDER BY c.name, c.id
            "#,
        )
        .bind(package_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(courses)
    }

    async fn courses_for_institute(&self, institute_id: Uuid) -> AppResult<Vec<NamedRef>> {
        let courses = sqlx::query_as::<_, NamedRef>(
            r#"
            SELECT DISTINCT c.id, c.name
            FROM courses c
            JOIN package_courses pc ON pc.course_id = c.id
            JOIN institute_packages ip ON ip.package_id = pc.package_id
            WHERE ip.institute_id = $1
            ORDER BY c.name, c.id
            "#,
        )
        .bind(institute_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(courses)
    }

    async fn students_in_institute(&self, institute_id: Uuid) -> AppResult<Vec<UserRecord>> {
        let students = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, role, institute_id
            FROM users
            WHERE institute_id = $1 AND role = $2
            ORDER BY name, id
            "#,
        )
        .bind(institute_id)
        .bind(Role::Student)
        .fetch_all(self.db.pool())
        .await?;

        Ok(students)
    }

    async fn list_institutes(&self) -> AppResult<Vec<NamedRef>> {
        let institutes =
            sqlx::query_as::<_, NamedRef>("SELECT id, name FROM institutes ORDER BY name, id")
                .fetch_all(self.db.pool())
                .await?;

        Ok(institutes)
    }

    async fn overall_counts(&self) -> AppResult<OverallCounts> {
        let counts = sqlx::query_as::<_, OverallCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM institutes) AS institutes,
                (SELECT COUNT(*) FROM users WHERE role = $1) AS students,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM tests) AS tests,
                (SELECT COUNT(*) FROM results) AS attempts
            "#,
        )
        .bind(Role::Student)
        .fetch_one(self.db.pool())
        .await?;

        Ok(counts)
    }
}
