//! Excel 工作簿渲染，每个版式工作表对应一个 worksheet。

use super::DocumentRenderer;
use crate::error::{AppError, AppResult};
use crate::reporting::layout::{Cell, DocumentLayout, NO_DATA, SectionBody};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

const COLUMN_WIDTH: f64 = 18.0;
const HEADER_FILL: u32 = 0xD9E1F2;

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetRenderer;

impl DocumentRenderer for SpreadsheetRenderer {
    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn render_layout(&self, layout: &DocumentLayout) -> AppResult<Vec<u8>> {
        build_workbook(layout).map_err(|e| AppError::render(format!("生成Excel失败: {}", e)))
    }
}

struct Styles {
    title: Format,
    bold: Format,
    header: Format,
    cell: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(16),
            bold: Format::new().set_bold(),
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_border(FormatBorder::Thin),
            cell: Format::new().set_border(FormatBorder::Thin),
        }
    }
}

fn build_workbook(layout: &DocumentLayout) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();

    for sheet in layout.sheets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet)?;

        let mut row = write_header_block(worksheet, layout, &styles)?;
        let mut max_columns: u16 = 2;

        for section in layout.sections.iter().filter(|s| s.sheet == sheet) {
            worksheet.write_string_with_format(row, 0, section.title, &styles.bold)?;
            row += 1;

            match &section.body {
                SectionBody::Fields(entries) => {
                    for (label, value) in entries {
                        worksheet.write_string_with_format(row, 0, *label, &styles.bold)?;
                        write_cell(worksheet, row, 1, value, None)?;
                        row += 1;
                    }
                }
                SectionBody::Table { headers, rows } => {
                    for (col, header) in headers.iter().enumerate() {
                        worksheet.write_string_with_format(row, col as u16, *header, &styles.header)?;
                    }
                    max_columns = max_columns.max(headers.len() as u16);
                    row += 1;

                    for cells in &table_body(rows) {
                        for (col, cell) in cells.iter().enumerate() {
                            write_cell(worksheet, row, col as u16, cell, Some(&styles.cell))?;
                        }
                        row += 1;
                    }
                }
            }
            row += 1;
        }

        for col in 0..max_columns {
            worksheet.set_column_width(col, COLUMN_WIDTH)?;
        }
    }

    workbook.save_to_buffer()
}

/// 表格数据行，空表输出一行占位
fn table_body(rows: &[Vec<Cell>]) -> Vec<Vec<Cell>> {
    if rows.is_empty() {
        vec![vec![Cell::text(NO_DATA)]]
    } else {
        rows.to_vec()
    }
}

/// 写入标题、类型、描述与生成时间，返回下一可用行
fn write_header_block(
    worksheet: &mut Worksheet,
    layout: &DocumentLayout,
    styles: &Styles,
) -> Result<u32, XlsxError> {
    let mut row = 0;
    worksheet.write_string_with_format(row, 0, &layout.title, &styles.title)?;
    row += 1;
    worksheet.write_string(row, 0, layout.subtitle)?;
    row += 1;
    if let Some(description) = &layout.description {
        worksheet.write_string(row, 0, description)?;
        row += 1;
    }
    worksheet.write_string(row, 0, layout.generated_label())?;
    row += 2;
    Ok(row)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (cell, format) {
        (Cell::Number(n), Some(f)) => worksheet.write_number_with_format(row, col, *n, f)?,
        (Cell::Number(n), None) => worksheet.write_number(row, col, *n)?,
        (Cell::Text(s), Some(f)) => worksheet.write_string_with_format(row, col, s, f)?,
        (Cell::Text(s), None) => worksheet.write_string(row, col, s)?,
    };
    Ok(())
}
