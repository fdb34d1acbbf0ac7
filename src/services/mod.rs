// 服务层模块
pub mod generation_dispatcher;
pub mod report_orchestrator;
pub mod startup_recovery;

pub use generation_dispatcher::{GenerationDispatcher, GenerationJob};
pub use report_orchestrator::ReportOrchestrator;
pub use startup_recovery::{RecoveryStats, StartupRecovery};
