pub mod academic;
pub mod report;

pub use academic::AcademicRepository;
pub use report::{ReportRepository, ReportStore};
