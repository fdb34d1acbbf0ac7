//! 测试用内存实现与示例数据。

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        MarksSummary, NamedRef, NewReport, OverallCounts, PagedResult, Pagination,
        QuestionResultRecord, Report, ReportFilter, ReportFormat, ReportStatus, ReportType,
        ReportVisibility, ResultQuery, ResultRecord, ResultStatus, Role, TestRecord, UserRecord,
    },
    reporting::AcademicSource,
    repositories::ReportStore,
    storage::{Storage, path_style_url},
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

pub const STORAGE_ENDPOINT: &str = "http://storage.test";

/// 内存学业数据源
#[derive(Debug, Default)]
pub struct MemoryAcademicSource {
    pub users: Vec<UserRecord>,
    pub institutes: Vec<NamedRef>,
    pub subjects: Vec<NamedRef>,
    pub courses: Vec<NamedRef>,
    pub packages: Vec<NamedRef>,
    pub tests: Vec<TestRecord>,
    pub results: Vec<ResultRecord>,
    pub question_results: Vec<QuestionResultRecord>,
    /// 课程 → 测试
    pub course_tests: HashMap<Uuid, Vec<Uuid>>,
    /// 课程包 → 课程
    pub package_courses: HashMap<Uuid, Vec<Uuid>>,
    /// 机构 → 可访问课程
    pub institute_courses: HashMap<Uuid, Vec<Uuid>>,
}

fn find_named(list: &[NamedRef], id: Uuid) -> Option<NamedRef> {
    list.iter().find(|n| n.id == id).cloned()
}

fn by_name(mut list: Vec<NamedRef>) -> Vec<NamedRef> {
    list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    list
}

impl MemoryAcademicSource {
    fn named_courses(&self, ids: &[Uuid]) -> Vec<NamedRef> {
        by_name(
            self.courses
                .iter()
                .filter(|c| ids.contains(&c.id))
                .cloned()
                .collect(),
        )
    }
}

#[async_trait]
impl AcademicSource for MemoryAcademicSource {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_institute(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        Ok(find_named(&self.institutes, id))
    }

    async fn find_subject(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        Ok(find_named(&self.subjects, id))
    }

    async fn find_course(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        Ok(find_named(&self.courses, id))
    }

    async fn find_package(&self, id: Uuid) -> AppResult<Option<NamedRef>> {
        Ok(find_named(&self.packages, id))
    }

    async fn find_test(&self, id: Uuid) -> AppResult<Option<TestRecord>> {
        Ok(self.tests.iter().find(|t| t.id == id).cloned())
    }

    async fn find_results(&self, query: &ResultQuery) -> AppResult<Vec<ResultRecord>> {
        let mut results: Vec<ResultRecord> = self
            .results
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn find_question_results(
        &self,
        result_ids: &[Uuid],
    ) -> AppResult<Vec<QuestionResultRecord>> {
        Ok(self
            .question_results
            .iter()
            .filter(|q| result_ids.contains(&q.result_id))
            .cloned()
            .collect())
    }

    async fn tests_for_course(&self, course_id: Uuid) -> AppResult<Vec<TestRecord>> {
        let ids = self.course_tests.get(&course_id).cloned().unwrap_or_default();
        Ok(self
            .tests
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn courses_in_package(&self, package_id: Uuid) -> AppResult<Vec<NamedRef>> {
        let ids = self.package_courses.get(&package_id).cloned().unwrap_or_default();
        Ok(self.named_courses(&ids))
    }

    async fn courses_for_institute(&self, institute_id: Uuid) -> AppResult<Vec<NamedRef>> {
        let ids = self
            .institute_courses
            .get(&institute_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.named_courses(&ids))
    }

    async fn students_in_institute(&self, institute_id: Uuid) -> AppResult<Vec<UserRecord>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == Role::Student && u.institute_id == Some(institute_id))
            .cloned()
            .collect())
    }

    async fn list_institutes(&self) -> AppResult<Vec<NamedRef>> {
        Ok(by_name(self.institutes.clone()))
    }

    async fn overall_counts(&self) -> AppResult<OverallCounts> {
        Ok(OverallCounts {
            institutes: self.institutes.len() as i64,
            students: self.users.iter().filter(|u| u.role == Role::Student).count() as i64,
            courses: self.courses.len() as i64,
            tests: self.tests.len() as i64,
            attempts: self.results.len() as i64,
        })
    }
}

/// 内存报告存储
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<Report> {
        self.reports.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn put(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }

    /// 直接改写状态（模拟并发中的生成任务）
    pub fn set_status(&self, id: Uuid, status: ReportStatus) {
        if let Some(report) = self.reports.lock().unwrap().iter_mut().find(|r| r.id == id) {
            report.status = status;
        }
    }

    fn update<F>(&self, id: Uuid, from: ReportStatus, apply: F) -> bool
    where
        F: FnOnce(&mut Report),
    {
        let mut reports = self.reports.lock().unwrap();
        match reports.iter_mut().find(|r| r.id == id && r.status == from) {
            Some(report) => {
                apply(report);
                report.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert(&self, new: NewReport) -> AppResult<Report> {
        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            report_type: new.report_type,
            format: new.format,
            status: ReportStatus::Pending,
            requested_by: new.requested_by,
            institute_id: new.institute_id,
            student_id: new.student_id,
            subject_id: new.subject_id,
            course_id: new.course_id,
            package_id: new.package_id,
            test_id: new.test_id,
            date_from: new.date_from,
            date_to: new.date_to,
            filters: new.filters,
            file_url: None,
            error_message: None,
            generated_at: None,
            created_at: now,
            updated_at: now,
        };
        self.put(report.clone());
        Ok(report)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Report>> {
        Ok(self.get(id))
    }

    async fn list(
        &self,
        filter: &ReportFilter,
        visibility: ReportVisibility,
        pagination: Pagination,
    ) -> AppResult<PagedResult<Report>> {
        let mut matched: Vec<Report> = self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| visibility.allows(r) && filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.page_size as usize)
            .collect();
        Ok(PagedResult::new(items, total, pagination))
    }

    async fn mark_processing(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.update(id, ReportStatus::Pending, |r| {
            r.status = ReportStatus::Processing;
        }))
    }

    async fn mark_completed(&self, id: Uuid, file_url: &str) -> AppResult<bool> {
        Ok(self.update(id, ReportStatus::Processing, |r| {
            r.status = ReportStatus::Completed;
            r.file_url = Some(file_url.to_string());
            r.error_message = None;
            r.generated_at = Some(Utc::now());
        }))
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> AppResult<bool> {
        Ok(self.update(id, ReportStatus::Processing, |r| {
            r.status = ReportStatus::Failed;
            r.file_url = None;
            r.error_message = Some(error_message.to_string());
        }))
    }

    async fn reset_to_pending(&self, id: Uuid) -> AppResult<Option<Report>> {
        let mut reports = self.reports.lock().unwrap();
        let Some(report) = reports
            .iter_mut()
            .find(|r| r.id == id && r.status != ReportStatus::Processing)
        else {
            return Ok(None);
        };
        report.status = ReportStatus::Pending;
        report.file_url = None;
        report.error_message = None;
        report.generated_at = None;
        report.updated_at = Utc::now();
        Ok(Some(report.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut reports = self.reports.lock().unwrap();
        let before = reports.len();
        reports.retain(|r| r.id != id);
        Ok(reports.len() < before)
    }

    async fn fail_interrupted(&self, error_message: &str) -> AppResult<u64> {
        let mut count = 0;
        for report in self.reports.lock().unwrap().iter_mut() {
            if report.status == ReportStatus::Processing {
                report.status = ReportStatus::Failed;
                report.file_url = None;
                report.error_message = Some(error_message.to_string());
                count += 1;
            }
        }
        Ok(count)
    }
}

/// 已上传的对象
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// 内存对象存储
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<Vec<StoredObject>>,
    fail_uploads: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail_uploads.store(true, Ordering::SeqCst);
        storage
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> AppResult<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::storage("upload rejected by storage"));
        }
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            data,
            content_type: content_type.map(str::to_string),
        });
        Ok(format!("etag-{}", key))
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        path_style_url(STORAGE_ENDPOINT, bucket, key)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.fail_uploads.load(Ordering::SeqCst))
    }
}

/// 构造一条作答记录
pub fn result_record(
    student_id: Uuid,
    test_id: Uuid,
    subject_id: Option<Uuid>,
    marks: Option<(f64, f64)>,
    finished: bool,
) -> ResultRecord {
    ResultRecord {
        id: Uuid::new_v4(),
        student_id,
        student_name: "Student".to_string(),
        institute_id: None,
        test_id,
        test_name: "Test".to_string(),
        subject_id,
        subject_name: subject_id.map(|_| "Subject".to_string()),
        status: if finished {
            ResultStatus::Finished
        } else {
            ResultStatus::NotFinished
        },
        marks: marks.map(|(obtained_marks, total_marks)| MarksSummary {
            obtained_marks,
            total_marks,
            correct: 0,
            incorrect: 0,
            skipped: 0,
        }),
        started_at: None,
        finished_at: None,
        created_at: Utc::now(),
    }
}

fn named(name: &str) -> NamedRef {
    NamedRef {
        id: Uuid::new_v4(),
        name: name.to_string(),
    }
}

fn user(name: &str, role: Role, institute: Option<&NamedRef>) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@coursehub.test", name.to_lowercase()),
        role,
        institute_id: institute.map(|i| i.id),
    }
}

/// 示例学校数据
///
/// 北校（North Academy）：Alice 代数 50/100、力学 30/50；Bob 代数 80/100、力学未完成；Carol 无作答。
/// 南校（South College）：Dan 代数 90/100。
pub struct School {
    pub source: MemoryAcademicSource,
    pub institute: NamedRef,
    pub other_institute: NamedRef,
    pub admin: UserRecord,
    pub teacher: UserRecord,
    pub other_teacher: UserRecord,
    pub alice: UserRecord,
    pub bob: UserRecord,
    pub carol: UserRecord,
    pub dan: UserRecord,
    pub math: NamedRef,
    pub physics: NamedRef,
    pub course: NamedRef,
    pub empty_course: NamedRef,
    pub package: NamedRef,
    pub algebra: TestRecord,
    pub mechanics: TestRecord,
}

impl School {
    pub fn build() -> Self {
        let institute = named("North Academy");
        let other_institute = named("South College");

        let admin = user("Admin", Role::Admin, None);
        let teacher = user("Tina", Role::Teacher, Some(&institute));
        let other_teacher = user("Sam", Role::Teacher, Some(&other_institute));
        let alice = user("Alice", Role::Student, Some(&institute));
        let bob = user("Bob", Role::Student, Some(&institute));
        let carol = user("Carol", Role::Student, Some(&institute));
        let dan = user("Dan", Role::Student, Some(&other_institute));

        let math = named("Mathematics");
        let physics = named("Physics");
        let course = named("Foundations");
        let empty_course = named("Electives");
        let package = named("Starter Pack");

        let algebra = TestRecord {
            id: Uuid::new_v4(),
            name: "Algebra Quiz".to_string(),
            subject_id: Some(math.id),
            subject_name: Some(math.name.clone()),
            total_marks: 100.0,
        };
        let mechanics = TestRecord {
            id: Uuid::new_v4(),
            name: "Mechanics Test".to_string(),
            subject_id: Some(physics.id),
            subject_name: Some(physics.name.clone()),
            total_marks: 50.0,
        };

        let now = Utc::now();
        let attempt = |student: &UserRecord,
                       test: &TestRecord,
                       marks: Option<(f64, f64, i32, i32, i32)>,
                       days_ago: i64| {
            ResultRecord {
                id: Uuid::new_v4(),
                student_id: student.id,
                student_name: student.name.clone(),
                institute_id: student.institute_id,
                test_id: test.id,
                test_name: test.name.clone(),
                subject_id: test.subject_id,
                subject_name: test.subject_name.clone(),
                status: if marks.is_some() {
                    ResultStatus::Finished
                } else {
                    ResultStatus::NotFinished
                },
                marks: marks.map(|(obtained_marks, total_marks, correct, incorrect, skipped)| {
                    MarksSummary {
                        obtained_marks,
                        total_marks,
                        correct,
                        incorrect,
                        skipped,
                    }
                }),
                started_at: Some(now - Duration::days(days_ago)),
                finished_at: marks.map(|_| now - Duration::days(days_ago)),
                created_at: now - Duration::days(days_ago),
            }
        };

        let alice_algebra = attempt(&alice, &algebra, Some((50.0, 100.0, 1, 1, 0)), 3);
        let alice_mechanics = attempt(&alice, &mechanics, Some((30.0, 50.0, 3, 2, 0)), 2);
        let bob_algebra = attempt(&bob, &algebra, Some((80.0, 100.0, 2, 0, 0)), 1);
        let bob_mechanics = attempt(&bob, &mechanics, None, 1);
        let dan_algebra = attempt(&dan, &algebra, Some((90.0, 100.0, 1, 0, 1)), 0);

        let sum_question = Uuid::new_v4();
        let solve_question = Uuid::new_v4();
        let question = |result: &ResultRecord,
                        question_id: Uuid,
                        text: &str,
                        attempted: bool,
                        is_correct: bool,
                        time_taken_secs: f64| QuestionResultRecord {
            result_id: result.id,
            question_id,
            question_text: Some(text.to_string()),
            attempted,
            is_correct,
            time_taken_secs,
        };
        let question_results = vec![
            question(&alice_algebra, sum_question, "What is 2+2?", true, true, 30.0),
            question(&alice_algebra, solve_question, "Solve x+1=3", true, false, 60.0),
            question(&bob_algebra, sum_question, "What is 2+2?", true, true, 20.0),
            question(&bob_algebra, solve_question, "Solve x+1=3", true, true, 40.0),
            question(&dan_algebra, sum_question, "What is 2+2?", true, true, 10.0),
            question(&dan_algebra, solve_question, "Solve x+1=3", false, false, 0.0),
        ];

        let source = MemoryAcademicSource {
            users: vec![
                admin.clone(),
                teacher.clone(),
                other_teacher.clone(),
                alice.clone(),
                bob.clone(),
                carol.clone(),
                dan.clone(),
            ],
            institutes: vec![institute.clone(), other_institute.clone()],
            subjects: vec![math.clone(), physics.clone()],
            courses: vec![course.clone(), empty_course.clone()],
            packages: vec![package.clone()],
            tests: vec![algebra.clone(), mechanics.clone()],
            results: vec![
                alice_algebra,
                alice_mechanics,
                bob_algebra,
                bob_mechanics,
                dan_algebra,
            ],
            question_results,
            course_tests: HashMap::from([
                (course.id, vec![algebra.id, mechanics.id]),
                (empty_course.id, vec![]),
            ]),
            package_courses: HashMap::from([(package.id, vec![course.id, empty_course.id])]),
            institute_courses: HashMap::from([
                (institute.id, vec![course.id]),
                (other_institute.id, vec![course.id]),
            ]),
        };

        Self {
            source,
            institute,
            other_institute,
            admin,
            teacher,
            other_teacher,
            alice,
            bob,
            carol,
            dan,
            math,
            physics,
            course,
            empty_course,
            package,
            algebra,
            mechanics,
        }
    }
}

/// 构造指定类型的报告，范围字段取示例学校中的实体
pub fn report_for(report_type: ReportType, school: &School) -> Report {
    let now = Utc::now();
    let mut report = Report {
        id: Uuid::new_v4(),
        name: format!("{} report", report_type),
        description: Some("Generated for tests".to_string()),
        report_type,
        format: ReportFormat::Pdf,
        status: ReportStatus::Pending,
        requested_by: school.teacher.id,
        institute_id: None,
        student_id: None,
        subject_id: None,
        course_id: None,
        package_id: None,
        test_id: None,
        date_from: None,
        date_to: None,
        filters: serde_json::json!({}),
        file_url: None,
        error_message: None,
        generated_at: None,
        created_at: now,
        updated_at: now,
    };
    match report_type {
        ReportType::Student => report.student_id = Some(school.alice.id),
        ReportType::Subject => report.subject_id = Some(school.math.id),
        ReportType::Course => report.course_id = Some(school.course.id),
        ReportType::Package => report.package_id = Some(school.package.id),
        ReportType::Test => report.test_id = Some(school.algebra.id),
        ReportType::Institute => report.institute_id = Some(school.institute.id),
        ReportType::Overall => {}
    }
    report
}

/// 用户对应的认证身份
pub fn auth_user(user: &UserRecord) -> AuthUser {
    AuthUser {
        user_id: user.id,
        role: user.role,
        institute_id: user.institute_id,
    }
}
