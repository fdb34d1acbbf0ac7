//! 文档渲染器。

pub mod pdf;
pub mod spreadsheet;

pub use pdf::PdfRenderer;
pub use spreadsheet::SpreadsheetRenderer;

use super::data::ReportData;
use super::layout::DocumentLayout;
use crate::error::AppResult;
use crate::models::{Report, ReportFormat};
use chrono::Utc;

/// 渲染器统一接口：数据 + 报告元信息 → 文件内容
pub trait DocumentRenderer: Send + Sync {
    /// MIME 类型
    fn content_type(&self) -> &'static str;

    /// 文件扩展名
    fn extension(&self) -> &'static str;

    fn render_layout(&self, layout: &DocumentLayout) -> AppResult<Vec<u8>>;

    fn render(&self, data: &ReportData, report: &Report) -> AppResult<Vec<u8>> {
        let layout = DocumentLayout::build(data, report, Utc::now());
        self.render_layout(&layout)
    }
}

/// 根据输出格式选择渲染器
pub fn renderer_for(format: ReportFormat) -> Box<dyn DocumentRenderer> {
    match format {
        ReportFormat::Pdf => Box::new(PdfRenderer),
        ReportFormat::Spreadsheet => Box::new(SpreadsheetRenderer),
    }
}
