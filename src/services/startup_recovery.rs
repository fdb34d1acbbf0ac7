use crate::{config::StartupRecoveryConfig, error::AppError, repositories::ReportStore};
use std::sync::Arc;
use tracing::{info, warn};

/// 服务重启导致生成中断时写入的错误信息
pub const INTERRUPTED_MESSAGE: &str = "generation interrupted by service restart";

/// 启动恢复服务
/// 生成任务只存在于进程内，重启后遗留的 processing 报告无法继续，统一标记为失败
#[derive(Clone)]
pub struct StartupRecovery {
    store: Arc<dyn ReportStore>,
    config: StartupRecoveryConfig,
}

/// 恢复统计信息
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    pub interrupted_failed: u64,
}

impl StartupRecovery {
    pub fn new(store: Arc<dyn ReportStore>, config: StartupRecoveryConfig) -> Self {
        Self { store, config }
    }

    /// 执行一次性恢复；pending 报告保持不变，由用户决定是否重新生成
    pub async fn run(&self) -> Result<RecoveryStats, AppError> {
        if !self.config.enabled {
            info!("启动恢复已禁用，跳过扫描");
            return Ok(RecoveryStats::default());
        }

        let interrupted_failed = self.store.fail_interrupted(INTERRUPTED_MESSAGE).await?;
        if interrupted_failed > 0 {
            warn!("启动恢复：{} 个中断的报告已标记为失败", interrupted_failed);
        } else {
            info!("启动恢复：没有中断的报告");
        }

        Ok(RecoveryStats { interrupted_failed })
    }
}
