//! 报告组装所需的只读学业数据接口。

use crate::error::AppResult;
use crate::models::{
    NamedRef, OverallCounts, QuestionResultRecord, ResultQuery, ResultRecord, TestRecord,
    UserRecord,
};
use async_trait::async_trait;
use uuid::Uuid;

/// 学业数据源
///
/// 生产环境由 `AcademicRepository` 基于 PostgreSQL 实现，测试中使用内存实现。
#[async_trait]
pub trait AcademicSource: Send + Sync {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<UserRecord>>;

    async fn find_institute(&self, id: Uuid) -> AppResult<Option<NamedRef>>;

    async fn find_subject(&self, id: Uuid) -> AppResult<Option<NamedRef>>;

    async fn find_course(&self, id: Uuid) -> AppResult<Option<NamedRef>>;

    async fn find_package(&self, id: Uuid) -> AppResult<Option<NamedRef>>;

    async fn find_test(&self, id: Uuid) -> AppResult<Option<TestRecord>>;

    /// 按条件查询作答记录
    async fn find_results(&self, query: &ResultQuery) -> AppResult<Vec<ResultRecord>>;

    /// 查询指定作答的单题结果
    async fn find_question_results(
        &self,
        result_ids: &[Uuid],
    ) -> AppResult<Vec<QuestionResultRecord>>;

    /// 课程主题树下的全部测试
    async fn tests_for_course(&self, course_id: Uuid) -> AppResult<Vec<TestRecord>>;

    /// 课程包包含的课程
    async fn courses_in_package(&self, package_id: Uuid) -> AppResult<Vec<NamedRef>>;

    /// 机构通过已订阅课程包可访问的课程
    async fn courses_for_institute(&self, institute_id: Uuid) -> AppResult<Vec<NamedRef>>;

    /// 机构下的学生
    async fn students_in_institute(&self, institute_id: Uuid) -> AppResult<Vec<UserRecord>>;

    async fn list_institutes(&self) -> AppResult<Vec<NamedRef>>;

    async fn overall_counts(&self) -> AppResult<OverallCounts>;
}
