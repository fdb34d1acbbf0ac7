use crate::{
    database::Database,
    error::AppResult,
    models::{
        NewReport, PagedResult, Pagination, Report, ReportFilter, ReportStatus, ReportVisibility,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const REPORT_COLUMNS: &str = r#"
    id, name, description, report_type, format, status, requested_by,
    institute_id, student_id, subject_id, course_id, package_id, test_id,
    date_from, date_to, filters, file_url, error_message, generated_at,
    created_at, updated_at
"#;

/// 报告记录存储
///
/// 状态更新均以当前状态为前提（条件更新），返回值表示是否有记录被更新。
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, report: NewReport) -> AppResult<Report>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Report>>;

    async fn list(
        &self,
        filter: &ReportFilter,
        visibility: ReportVisibility,
        pagination: Pagination,
    ) -> AppResult<PagedResult<Report>>;

    /// pending → processing
    async fn mark_processing(&self, id: Uuid) -> AppResult<bool>;

    /// processing → completed
    async fn mark_completed(&self, id: Uuid, file_url: &str) -> AppResult<bool>;

    /// processing → failed
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> AppResult<bool>;

    /// completed/failed/pending → pending，清除文件地址与错误信息
    async fn reset_to_pending(&self, id: Uuid) -> AppResult<Option<Report>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// 将所有 processing 报告标记为失败，返回受影响数量
    async fn fail_interrupted(&self, error_message: &str) -> AppResult<u64>;
}

/// 报告仓库（PostgreSQL）
#[derive(Clone)]
pub struct ReportRepository {
    db: Database,
}

impl ReportRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn apply_filter(
        builder: &mut QueryBuilder<'_, Postgres>,
        filter: &ReportFilter,
        visibility: ReportVisibility,
    ) {
        builder.push(" WHERE 1=1");

        if let ReportVisibility::Restricted {
            user_id,
            institute_id,
        } = visibility
        {
            builder.push(" AND (requested_by = ");
            builder.push_bind(user_id);
            if let Some(institute_id) = institute_id {
                builder.push(" OR institute_id = ");
                builder.push_bind(institute_id);
            }
            builder.push(")");
        }

        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            builder.push(" AND (name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(r" ESCAPE '\')");
        }

        if let Some(report_type) = filter.report_type {
            builder.push(" AND report_type = ");
            builder.push_bind(report_type);
        }

        if let Some(format) = filter.format {
            builder.push(" AND format = ");
            builder.push_bind(format);
        }

        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }

        let scopes = [
            ("institute_id", filter.institute_id),
            ("student_id", filter.student_id),
            ("subject_id", filter.subject_id),
            ("course_id", filter.course_id),
            ("package_id", filter.package_id),
            ("test_id", filter.test_id),
        ];
        for (column, value) in scopes {
            if let Some(id) = value {
                builder.push(format!(" AND {} = ", column));
                builder.push_bind(id);
            }
        }

        if let Some(start) = filter.start_date {
            builder.push(" AND created_at >= ");
            builder.push_bind(start);
        }

        if let Some(end) = filter.end_date {
            builder.push(" AND created_at <= ");
            builder.push_bind(end);
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
        file_url: Option<&str>,
        error_message: Option<&str>,
    ) -> AppResult<bool> {
        let now = Utc::now();
        let generated_at = (to == ReportStatus::Completed).then_some(now);

        let result = sqlx::query(
            r#"
            UPDATE reports SET
                status = $3,
                file_url = $4,
                error_message = $5,
                generated_at = COALESCE($6, generated_at),
                updated_at = $7
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(file_url)
        .bind(error_message)
        .bind(generated_at)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn insert(&self, report: NewReport) -> AppResult<Report> {
        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO reports (
                id, name, description, report_type, format, status, requested_by,
                institute_id, student_id, subject_id, course_id, package_id, test_id,
                date_from, date_to, filters, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );

        let created = sqlx::query_as::<_, Report>(&sql)
            .bind(Uuid::new_v4())
            .bind(report.name)
            .bind(report.description)
            .bind(report.report_type)
            .bind(report.format)
            .bind(ReportStatus::Pending)
            .bind(report.requested_by)
            .bind(report.institute_id)
            .bind(report.student_id)
            .bind(report.subject_id)
            .bind(report.course_id)
            .bind(report.package_id)
            .bind(report.test_id)
            .bind(report.date_from)
            .bind(report.date_to)
            .bind(report.filters)
            .bind(now)
            .bind(now)
            .fetch_one(self.db.pool())
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Report>> {
        let sql = format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS);
        let report = sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(report)
    }

    async fn list(
        &self,
        filter: &ReportFilter,
        visibility: ReportVisibility,
        pagination: Pagination,
    ) -> AppResult<PagedResult<Report>> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM reports", REPORT_COLUMNS));
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM reports");

        // 应用过滤条件
        Self::apply_filter(&mut query_builder, filter, visibility);
        Self::apply_filter(&mut count_builder, filter, visibility);

        // 添加排序与分页
        query_builder.push(" ORDER BY created_at DESC, id DESC");
        query_builder.push(" LIMIT ");
        query_builder.push_bind(pagination.page_size as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(pagination.offset());

        let reports = query_builder
            .build_query_as::<Report>()
            .fetch_all(self.db.pool())
            .await?;

        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;

        Ok(PagedResult::new(reports, total, pagination))
    }

    async fn mark_processing(&self, id: Uuid) -> AppResult<bool> {
        self.transition(id, ReportStatus::Pending, ReportStatus::Processing, None, None)
            .await
    }

    async fn mark_completed(&self, id: Uuid, file_url: &str) -> AppResult<bool> {
        self.transition(
            id,
            ReportStatus::Processing,
            ReportStatus::Completed,
            Some(file_url),
            None,
        )
        .await
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> AppResult<bool> {
        self.transition(
            id,
            ReportStatus::Processing,
            ReportStatus::Failed,
            None,
            Some(error_message),
        )
        .await
    }

    async fn reset_to_pending(&self, id: Uuid) -> AppResult<Option<Report>> {
        let sql = format!(
            r#"
            UPDATE reports SET
                status = $2,
                file_url = NULL,
                error_message = NULL,
                generated_at = NULL,
                updated_at = $3
            WHERE id = $1 AND status <> $4
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );

        let report = sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .bind(ReportStatus::Pending)
            .bind(Utc::now())
            .bind(ReportStatus::Processing)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(report)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fail_interrupted(&self, error_message: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reports SET
                status = $1,
                error_message = $2,
                file_url = NULL,
                updated_at = $3
            WHERE status = $4
            "#,
        )
        .bind(ReportStatus::Failed)
        .bind(error_message)
        .bind(Utc::now())
        .bind(ReportStatus::Processing)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }
}

/// 模糊搜索模式，用户输入中的通配符按字面匹配
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("algebra"), "%algebra%");
        assert_eq!(like_pattern("100%"), r"%100\%%");
        assert_eq!(like_pattern("term_1"), r"%term\_1%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_search_clause_uses_escape() {
        let filter = ReportFilter {
            search: Some("50%".to_string()),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reports");
        ReportRepository::apply_filter(&mut builder, &filter, ReportVisibility::All);
        let sql = builder.sql();
        assert_eq!(sql.matches(r"ESCAPE '\'").count(), 2);
    }
}
