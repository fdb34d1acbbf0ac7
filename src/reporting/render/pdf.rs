//! PDF 渲染（A4 纵向，固定边距与等宽列）。

use super::DocumentRenderer;
use crate::error::{AppError, AppResult};
use crate::reporting::layout::{Cell, DocumentLayout, NO_DATA, SectionBody};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const TITLE_SIZE: i64 = 18;
const HEADING_SIZE: i64 = 13;
const BODY_SIZE: i64 = 9;
const LINE_HEIGHT: i64 = 14;
const FIELD_LABEL_WIDTH: i64 = 160;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render_layout(&self, layout: &DocumentLayout) -> AppResult<Vec<u8>> {
        let mut writer = PageWriter::new();

        writer.line(TITLE_SIZE + 6, BOLD, TITLE_SIZE, &layout.title);
        writer.line(LINE_HEIGHT + 2, REGULAR, HEADING_SIZE - 2, layout.subtitle);
        if let Some(description) = &layout.description {
            writer.line(LINE_HEIGHT, REGULAR, BODY_SIZE + 1, description);
        }
        writer.line(LINE_HEIGHT, REGULAR, BODY_SIZE, &layout.generated_label());
        writer.gap(LINE_HEIGHT);

        for section in &layout.sections {
            writer.ensure_space(HEADING_SIZE + LINE_HEIGHT * 2);
            writer.line(HEADING_SIZE + 8, BOLD, HEADING_SIZE, section.title);

            match &section.body {
                SectionBody::Fields(entries) => {
                    for (label, value) in entries {
                        writer.ensure_space(LINE_HEIGHT);
                        writer.advance(LINE_HEIGHT);
                        writer.text(MARGIN, BOLD, BODY_SIZE, label);
                        writer.text(
                            MARGIN + FIELD_LABEL_WIDTH,
                            REGULAR,
                            BODY_SIZE,
                            &value.to_string(),
                        );
                    }
                }
                SectionBody::Table { headers, rows } => {
                    writer.table(headers, rows);
                }
            }
            writer.gap(LINE_HEIGHT);
        }

        writer.finish()
    }
}

/// 分页写入器，y 坐标自页面顶部向下推进
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// 剩余空间不足时换页，返回是否换页
    fn ensure_space(&mut self, height: i64) -> bool {
        if self.y - height < MARGIN {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn advance(&mut self, height: i64) {
        self.y -= height;
    }

    fn gap(&mut self, height: i64) {
        if self.y - height >= MARGIN {
            self.y -= height;
        }
    }

    fn line(&mut self, height: i64, font: &str, size: i64, value: &str) {
        self.ensure_space(height);
        self.advance(height);
        self.text(MARGIN, font, size, value);
    }

    fn text(&mut self, x: i64, font: &str, size: i64, value: &str) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![x.into(), self.y.into()]),
            Operation::new("Tj", vec![Object::string_literal(pdf_text(value))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn table(&mut self, headers: &[&str], rows: &[Vec<Cell>]) {
        let available = PAGE_WIDTH - MARGIN * 2;
        let column_width = available / headers.len().max(1) as i64;

        self.ensure_space(LINE_HEIGHT * 2);
        self.header_row(headers, column_width);

        if rows.is_empty() {
            self.advance(LINE_HEIGHT);
            self.text(MARGIN, REGULAR, BODY_SIZE, NO_DATA);
            return;
        }

        for row in rows {
            // 换页后重复表头
            if self.ensure_space(LINE_HEIGHT) {
                self.header_row(headers, column_width);
            }
            self.advance(LINE_HEIGHT);
            for (index, cell) in row.iter().enumerate() {
                let x = MARGIN + column_width * index as i64;
                let value = truncate(&cell.to_string(), column_width, BODY_SIZE);
                self.text(x, REGULAR, BODY_SIZE, &value);
            }
        }
    }

    fn header_row(&mut self, headers: &[&str], column_width: i64) {
        self.advance(LINE_HEIGHT);
        for (index, header) in headers.iter().enumerate() {
            let x = MARGIN + column_width * index as i64;
            let value = truncate(header, column_width, BODY_SIZE);
            self.text(x, BOLD, BODY_SIZE, &value);
        }
        // 表头下划线
        let line_y = self.y - 4;
        self.current.extend([
            Operation::new("w", vec![Object::Real(0.5)]),
            Operation::new("m", vec![MARGIN.into(), line_y.into()]),
            Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), line_y.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    fn finish(mut self) -> AppResult<Vec<u8>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.new_page();
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(font_dictionary("Helvetica"));
        let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular_id,
                BOLD => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|e| AppError::render(format!("PDF内容编码失败: {}", e)))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| AppError::render(format!("PDF写入失败: {}", e)))?;
        Ok(buffer)
    }
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// 标准字体仅支持单字节编码，非 ASCII 字符替换为 '?'
fn pdf_text(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// 按列宽截断（Helvetica 平均字宽约为字号的一半）
fn truncate(value: &str, column_width: i64, font_size: i64) -> String {
    let max_chars = ((column_width - 4) * 2 / font_size).max(3) as usize;
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let kept: String = value.chars().take(max_chars - 2).collect();
        format!("{}..", kept)
    }
}
