use crate::{
    auth::AuthUser,
    config::ReportConfig,
    error::{AppError, AppResult},
    models::{
        CreateReportRequest, NamedRef, NewReport, PagedResult, Report, ReportDetail,
        ReportQueryParams, ReportStatus, ScopeField, ScopeReferences,
    },
    reporting::{AcademicSource, assemble, renderer_for},
    repositories::ReportStore,
    services::generation_dispatcher::{GenerationDispatcher, GenerationJob},
    storage::{Storage, path_style_url},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 报告编排服务
///
/// 负责提交、后台生成、重新生成、删除与查询。生成过程中的错误只记录在报告上，不向调用方传播。
#[derive(Clone)]
pub struct ReportOrchestrator {
    store: Arc<dyn ReportStore>,
    source: Arc<dyn AcademicSource>,
    storage: Arc<dyn Storage>,
    dispatcher: GenerationDispatcher,
    config: ReportConfig,
}

impl ReportOrchestrator {
    pub fn new(
        store: Arc<dyn ReportStore>,
        source: Arc<dyn AcademicSource>,
        storage: Arc<dyn Storage>,
        config: ReportConfig,
    ) -> Self {
        let dispatcher = GenerationDispatcher::new(config.max_concurrent_jobs as usize);
        Self {
            store,
            source,
            storage,
            dispatcher,
            config,
        }
    }

    pub fn dispatcher(&self) -> &GenerationDispatcher {
        &self.dispatcher
    }

    /// 提交报告：校验后以 pending 状态入库并派发生成任务
    pub async fn submit(
        &self,
        request: CreateReportRequest,
        requester: &AuthUser,
    ) -> AppResult<(Report, GenerationJob)> {
        request.validate()?;
        self.ensure_scope_exists(&request).await?;

        let report = self
            .store
            .insert(NewReport::from_request(request, requester.user_id))
            .await?;

        info!(
            report_id = %report.id,
            report_type = %report.report_type,
            format = %report.format,
            "报告已提交"
        );

        let job = self.spawn_generation(report.id);
        Ok((report, job))
    }

    /// 后台生成：pending → processing → completed | failed
    pub async fn generate(&self, report_id: Uuid) {
        match self.store.mark_processing(report_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(report_id = %report_id, "报告不处于 pending 状态，跳过生成");
                return;
            }
            Err(e) => {
                error!(report_id = %report_id, "更新报告状态失败: {}", e);
                return;
            }
        }

        info!(report_id = %report_id, "报告开始生成");

        match self.produce_artifact(report_id).await {
            Ok(file_url) => match self.store.mark_completed(report_id, &file_url).await {
                Ok(true) => info!(report_id = %report_id, file_url = %file_url, "报告生成完成"),
                Ok(false) => warn!(report_id = %report_id, "报告已不处于 processing 状态，丢弃生成结果"),
                Err(e) => error!(report_id = %report_id, "记录报告完成状态失败: {}", e),
            },
            Err(e) => {
                error!(report_id = %report_id, error = %e, "报告生成失败");
                if let Err(store_err) = self.store.mark_failed(report_id, &e.to_string()).await {
                    error!(report_id = %report_id, "记录报告失败状态失败: {}", store_err);
                }
            }
        }
    }

    /// 重新生成：仅创建者或管理员，处理中的报告不可重置
    pub async fn regenerate(
        &self,
        report_id: Uuid,
        requester: &AuthUser,
    ) -> AppResult<(Report, GenerationJob)> {
        let report = self.load(report_id).await?;
        if !requester.can_manage(&report) {
            return Err(AppError::forbidden(
                "only the creator or an admin can regenerate this report",
            ));
        }
        if !report.status.can_transition_to(ReportStatus::Pending) {
            return Err(AppError::bad_request(
                "report is being generated and cannot be regenerated now",
            ));
        }

        let reset = self.store.reset_to_pending(report_id).await?.ok_or_else(|| {
            AppError::bad_request("report is being generated and cannot be regenerated now")
        })?;

        info!(report_id = %report_id, previous_status = %report.status, "报告已重置为 pending");

        let job = self.spawn_generation(reset.id);
        Ok((reset, job))
    }

    /// 删除报告记录（存储中的文件保留）
    pub async fn remove(&self, report_id: Uuid, requester: &AuthUser) -> AppResult<()> {
        let report = self.load(report_id).await?;
        if !requester.can_manage(&report) {
            return Err(AppError::forbidden(
                "only the creator or an admin can delete this report",
            ));
        }

        if !self.store.delete(report_id).await? {
            return Err(AppError::not_found(format!("report {}", report_id)));
        }

        info!(report_id = %report_id, "报告已删除");
        Ok(())
    }

    /// 查询报告详情（只读，不触发生成）
    pub async fn get(&self, report_id: Uuid, requester: &AuthUser) -> AppResult<ReportDetail> {
        let report = self.load(report_id).await?;
        if !requester.visibility().allows(&report) {
            return Err(AppError::forbidden("you do not have access to this report"));
        }

        let references = self.references(&report).await?;
        Ok(ReportDetail { report, references })
    }

    /// 分页查询，非管理员只能看到本人创建或本机构的报告
    pub async fn list(
        &self,
        params: ReportQueryParams,
        requester: &AuthUser,
    ) -> AppResult<PagedResult<Report>> {
        let (filter, pagination) = params.into_parts();
        self.store
            .list(&filter, requester.visibility(), pagination)
            .await
    }

    async fn load(&self, report_id: Uuid) -> AppResult<Report> {
        self.store
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("report {}", report_id)))
    }

    fn spawn_generation(&self, report_id: Uuid) -> GenerationJob {
        let orchestrator = self.clone();
        self.dispatcher.dispatch(report_id, async move {
            orchestrator.generate(report_id).await;
        })
    }

    /// 组装 → 渲染 → 上传，返回文件地址
    async fn produce_artifact(&self, report_id: Uuid) -> AppResult<String> {
        let report = self.load(report_id).await?;
        let data = assemble(self.source.as_ref(), &report).await?;

        let renderer = renderer_for(report.format);
        let bytes = renderer.render(&data, &report)?;

        let file_stem = format!("{}_{}", report.id, Utc::now().format("%Y%m%d%H%M%S"));
        let key = self
            .config
            .object_key(report.report_type.as_str(), &file_stem, renderer.extension());

        debug!(report_id = %report_id, key = %key, size = bytes.len(), "上传报告文件");
        self.storage
            .upload(&self.config.bucket, &key, bytes, Some(renderer.content_type()))
            .await?;

        Ok(self.artifact_url(&key))
    }

    fn artifact_url(&self, key: &str) -> String {
        match &self.config.public_base_url {
            Some(base) => path_style_url(base, &self.config.bucket, key),
            None => self.storage.object_url(&self.config.bucket, key),
        }
    }

    /// 校验请求中引用的实体均存在
    async fn ensure_scope_exists(&self, request: &CreateReportRequest) -> AppResult<()> {
        for field in ScopeField::ALL {
            if let Some(id) = request.scope_id(field) {
                if self.lookup_name(field, id).await?.is_none() {
                    let entity = field.field_name().trim_end_matches("_id");
                    return Err(AppError::not_found(format!("{} {}", entity, id)));
                }
            }
        }

        Ok(())
    }

    async fn lookup_name(&self, field: ScopeField, id: Uuid) -> AppResult<Option<NamedRef>> {
        let found = match field {
            ScopeField::Institute => self.source.find_institute(id).await?,
            ScopeField::Student => self
                .source
                .find_user(id)
                .await?
                .filter(|u| u.is_student())
                .map(|u| NamedRef { id: u.id, name: u.name }),
            ScopeField::Subject => self.source.find_subject(id).await?,
            ScopeField::Course => self.source.find_course(id).await?,
            ScopeField::Package => self.source.find_package(id).await?,
            ScopeField::Test => self
                .source
                .find_test(id)
                .await?
                .map(|t| NamedRef { id: t.id, name: t.name }),
        };
        Ok(found)
    }

    async fn references(&self, report: &Report) -> AppResult<ScopeReferences> {
        let mut references = ScopeReferences {
            requester: self
                .source
                .find_user(report.requested_by)
                .await?
                .map(|u| NamedRef { id: u.id, name: u.name }),
            ..Default::default()
        };

        for field in ScopeField::ALL {
            let Some(id) = report.scope_id(field) else {
                continue;
            };
            let name = self.lookup_name(field, id).await?;
            match field {
                ScopeField::Institute => references.institute = name,
                ScopeField::Student => references.student = name,
                ScopeField::Subject => references.subject = name,
                ScopeField::Course => references.course = name,
                ScopeField::Package => references.package = name,
                ScopeField::Test => references.test = name,
            }
        }

        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportFormat, ReportType};
    use crate::testing::{
        MemoryReportStore, MemoryStorage, STORAGE_ENDPOINT, School, auth_user, report_for,
    };

    struct Harness {
        orchestrator: ReportOrchestrator,
        store: Arc<MemoryReportStore>,
        storage: Arc<MemoryStorage>,
        school: School,
    }

    fn harness_with(storage: MemoryStorage) -> Harness {
        let mut school = School::build();
        let source = Arc::new(std::mem::take(&mut school.source));
        let store = Arc::new(MemoryReportStore::new());
        let storage = Arc::new(storage);
        let orchestrator = ReportOrchestrator::new(
            store.clone(),
            source,
            storage.clone(),
            ReportConfig::default(),
        );
        Harness {
            orchestrator,
            store,
            storage,
            school,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStorage::new())
    }

    fn request_for(report_type: ReportType, school: &School) -> CreateReportRequest {
        let report = report_for(report_type, school);
        CreateReportRequest {
            name: report.name,
            description: report.description,
            report_type,
            format: ReportFormat::Pdf,
            institute_id: report.institute_id,
            student_id: report.student_id,
            subject_id: report.subject_id,
            course_id: report.course_id,
            package_id: report.package_id,
            test_id: report.test_id,
            date_range: None,
            filters: None,
        }
    }

    async fn submit_and_wait(h: &Harness, request: CreateReportRequest) -> Report {
        let teacher = auth_user(&h.school.teacher);
        let (report, job) = h.orchestrator.submit(request, &teacher).await.unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(job.wait().await);
        h.store.get(report.id).unwrap()
    }

    #[tokio::test]
    async fn test_missing_scope_is_rejected_and_not_stored() {
        let h = harness();
        let mut request = request_for(ReportType::Student, &h.school);
        request.student_id = None;

        let err = h
            .orchestrator
            .submit(request, &auth_user(&h.school.teacher))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "验证错误: student_id is required for student reports");
        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_scope_entity_is_not_found() {
        let h = harness();
        let mut request = request_for(ReportType::Test, &h.school);
        request.test_id = Some(Uuid::new_v4());

        let err = h
            .orchestrator
            .submit(request, &auth_user(&h.school.teacher))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn test_student_scope_must_be_a_student() {
        let h = harness();
        let mut request = request_for(ReportType::Student, &h.school);
        request.student_id = Some(h.school.teacher.id);

        let err = h
            .orchestrator
            .submit(request, &auth_user(&h.school.teacher))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn test_submit_produces_completed_pdf() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Student, &h.school)).await;

        assert_eq!(report.status, ReportStatus::Completed);
        assert!(report.error_message.is_none());
        assert!(report.generated_at.is_some());
        let url = report.file_url.unwrap();
        let prefix = format!(
            "{}/coursehub-reports/reports/student/{}_",
            STORAGE_ENDPOINT, report.id
        );
        assert!(url.starts_with(&prefix), "unexpected url {}", url);
        assert!(url.ends_with(".pdf"));

        let objects = h.storage.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].content_type.as_deref(), Some("application/pdf"));
        assert!(objects[0].data.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_spreadsheet_artifact_extension() {
        let h = harness();
        let mut request = request_for(ReportType::Institute, &h.school);
        request.format = ReportFormat::Spreadsheet;

        let report = submit_and_wait(&h, request).await;
        assert_eq!(report.status, ReportStatus::Completed);
        assert!(report.file_url.unwrap().ends_with(".xlsx"));
    }

    #[tokio::test]
    async fn test_student_without_results_renders_both_formats() {
        let h = harness();
        for format in ReportFormat::ALL {
            let mut request = request_for(ReportType::Student, &h.school);
            request.student_id = Some(h.school.carol.id);
            request.format = format;

            let report = submit_and_wait(&h, request).await;
            assert_eq!(report.status, ReportStatus::Completed, "{}", format);
        }
        assert_eq!(h.storage.objects().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_marks_report_failed() {
        let h = harness_with(MemoryStorage::failing());
        let report = submit_and_wait(&h, request_for(ReportType::Course, &h.school)).await;

        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.file_url.is_none());
        assert!(report.error_message.unwrap().contains("upload rejected"));
    }

    #[tokio::test]
    async fn test_regenerate_resets_terminal_reports() {
        let h = harness_with(MemoryStorage::failing());
        let failed = submit_and_wait(&h, request_for(ReportType::Subject, &h.school)).await;
        assert_eq!(failed.status, ReportStatus::Failed);

        let teacher = auth_user(&h.school.teacher);
        let (reset, job) = h.orchestrator.regenerate(failed.id, &teacher).await.unwrap();
        assert_eq!(reset.status, ReportStatus::Pending);
        assert!(reset.error_message.is_none());
        assert!(reset.file_url.is_none());
        assert!(reset.generated_at.is_none());
        job.wait().await;

        let h = harness();
        let completed = submit_and_wait(&h, request_for(ReportType::Subject, &h.school)).await;
        let admin = auth_user(&h.school.admin);
        let (reset, job) = h.orchestrator.regenerate(completed.id, &admin).await.unwrap();
        assert_eq!(reset.status, ReportStatus::Pending);
        assert!(reset.file_url.is_none());
        job.wait().await;

        let regenerated = h.store.get(completed.id).unwrap();
        assert_eq!(regenerated.status, ReportStatus::Completed);
        assert_eq!(h.storage.objects().len(), 2);
    }

    #[tokio::test]
    async fn test_regenerate_requires_creator_or_admin() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Test, &h.school)).await;

        let err = h
            .orchestrator
            .regenerate(report.id, &auth_user(&h.school.alice))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(h.store.get(report.id).unwrap().status, ReportStatus::Completed);
    }

    #[tokio::test]
    async fn test_regenerate_rejected_while_processing() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Test, &h.school)).await;
        h.store.set_status(report.id, ReportStatus::Processing);

        let err = h
            .orchestrator
            .regenerate(report.id, &auth_user(&h.school.teacher))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_generate_skips_non_pending_reports() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Overall, &h.school)).await;

        h.orchestrator.generate(report.id).await;
        let again = h.store.get(report.id).unwrap();
        assert_eq!(again.status, ReportStatus::Completed);
        assert_eq!(again.file_url, report.file_url);
        assert_eq!(h.storage.objects().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_get_does_not_regenerate() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Student, &h.school)).await;
        let teacher = auth_user(&h.school.teacher);

        let first = h.orchestrator.get(report.id, &teacher).await.unwrap();
        let second = h.orchestrator.get(report.id, &teacher).await.unwrap();
        assert_eq!(first.report.file_url, second.report.file_url);
        assert_eq!(second.report.status, ReportStatus::Completed);
        assert_eq!(h.storage.objects().len(), 1);

        assert_eq!(first.references.student.unwrap().name, "Alice");
        assert_eq!(first.references.requester.unwrap().name, "Tina");
    }

    #[tokio::test]
    async fn test_get_visibility() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Institute, &h.school)).await;

        // 同机构成员可见
        assert!(h.orchestrator.get(report.id, &auth_user(&h.school.alice)).await.is_ok());
        assert!(h.orchestrator.get(report.id, &auth_user(&h.school.admin)).await.is_ok());

        // 其他机构、非创建者、非管理员
        let err = h
            .orchestrator
            .get(report.id, &auth_user(&h.school.other_teacher))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_remove() {
        let h = harness();
        let report = submit_and_wait(&h, request_for(ReportType::Package, &h.school)).await;

        let err = h
            .orchestrator
            .remove(report.id, &auth_user(&h.school.other_teacher))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let teacher = auth_user(&h.school.teacher);
        h.orchestrator.remove(report.id, &teacher).await.unwrap();
        assert_eq!(h.store.len(), 0);
        // 存储中的文件保留
        assert_eq!(h.storage.objects().len(), 1);

        let err = h.orchestrator.get(report.id, &teacher).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_requester() {
        let h = harness();
        submit_and_wait(&h, request_for(ReportType::Student, &h.school)).await;

        let mut request = request_for(ReportType::Overall, &h.school);
        request.name = "South overview".to_string();
        let other = auth_user(&h.school.other_teacher);
        let (_, job) = h.orchestrator.submit(request, &other).await.unwrap();
        job.wait().await;

        let teacher = auth_user(&h.school.teacher);
        let mine = h
            .orchestrator
            .list(ReportQueryParams::default(), &teacher)
            .await
            .unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].report_type, ReportType::Student);

        let admin = auth_user(&h.school.admin);
        let all = h
            .orchestrator
            .list(ReportQueryParams::default(), &admin)
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let searched = h
            .orchestrator
            .list(
                ReportQueryParams {
                    search: Some("south".to_string()),
                    ..Default::default()
                },
                &admin,
            )
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
    }
}
