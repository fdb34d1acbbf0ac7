//! 报告生成核心：数据组装、统计与文档渲染。

pub mod accumulator;
pub mod analytics;
pub mod assemblers;
pub mod data;
pub mod layout;
pub mod render;
pub mod source;
pub mod stats;

pub use assemblers::assemble;
pub use data::ReportData;
pub use render::{DocumentRenderer, renderer_for};
pub use source::AcademicSource;
