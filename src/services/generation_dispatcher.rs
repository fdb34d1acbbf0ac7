use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// 报告生成任务调度器
///
/// 每个任务独立 spawn，由信号量限制同时运行的数量。
#[derive(Debug, Clone)]
pub struct GenerationDispatcher {
    semaphore: Arc<Semaphore>,
    max_jobs: usize,
}

/// 已派发的生成任务
#[derive(Debug)]
pub struct GenerationJob {
    report_id: Uuid,
    handle: JoinHandle<()>,
}

impl GenerationJob {
    pub fn report_id(&self) -> Uuid {
        self.report_id
    }

    /// 等待任务结束，任务 panic 时返回 false
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(()) => true,
            Err(e) => {
                error!(report_id = %self.report_id, "报告生成任务异常退出: {}", e);
                false
            }
        }
    }
}

impl GenerationDispatcher {
    pub fn new(max_jobs: usize) -> Self {
        let max_jobs = max_jobs.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_jobs)),
            max_jobs,
        }
    }

    /// 派发任务，调用方无需等待
    pub fn dispatch<F>(&self, report_id: Uuid, work: F) -> GenerationJob
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(report_id = %report_id, "调度器已关闭，放弃生成任务");
                    return;
                }
            };
            debug!(report_id = %report_id, "开始执行报告生成任务");
            work.await;
        });

        GenerationJob { report_id, handle }
    }

    pub fn capacity(&self) -> usize {
        self.max_jobs
    }

    /// 正在运行的任务数
    pub fn running_jobs(&self) -> usize {
        self.max_jobs
            .saturating_sub(self.semaphore.available_permits())
    }
}
