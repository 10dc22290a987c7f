use std::ops::Range;

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point,
};

use crate::models::{ReportError, TabularReport};

// A4 landscape, millimetres.
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 15.0;
const ROW_HEIGHT: f32 = 6.0;
const TITLE_BLOCK: f32 = 16.0;
const BOTTOM_RESERVE: f32 = 12.0;

const TITLE_SIZE: f32 = 14.0;
const TEXT_SIZE: f32 = 8.0;
// Average Helvetica glyph width at TEXT_SIZE.
const CHAR_WIDTH: f32 = 1.45;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn render_error(err: impl std::fmt::Display) -> ReportError {
    ReportError::Render(err.to_string())
}

/// Data rows that fit below a table header starting at `top`.
fn rows_fitting(top: f32) -> usize {
    let usable = top - MARGIN - BOTTOM_RESERVE;
    ((usable / ROW_HEIGHT).floor() as usize).saturating_sub(1).max(1)
}

/// Row ranges per page; the first page also carries the title block.
/// Always at least one page, so an empty report still renders its header.
pub fn page_ranges(total: usize, first_capacity: usize, capacity: usize) -> Vec<Range<usize>> {
    let mut ranges = vec![0..total.min(first_capacity)];
    let mut start = ranges[0].end;
    while start < total {
        let end = (start + capacity).min(total);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

fn fit(text: &str, width: f32) -> String {
    let max_chars = ((width - 1.0) / CHAR_WIDTH).max(3.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn rule(layer: &PdfLayerReference, y: f32) {
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(y)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn header_row(layer: &PdfLayerReference, fonts: &Fonts, report: &TabularReport, col_width: f32, y: f32) {
    for (index, column) in report.columns.iter().enumerate() {
        let x = MARGIN + col_width * index as f32;
        layer.use_text(fit(column, col_width), TEXT_SIZE, Mm(x), Mm(y), &fonts.bold);
    }
    rule(layer, y - 1.5);
}

fn new_page(doc: &PdfDocumentReference, number: usize) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", number));
    doc.get_page(page).get_layer(layer)
}

pub fn render_pdf(report: &TabularReport) -> Result<Vec<u8>, ReportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(&report.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_error)?,
    };

    let col_width = (PAGE_WIDTH - 2.0 * MARGIN) / report.columns.len().max(1) as f32;
    let first_top = PAGE_HEIGHT - MARGIN - TITLE_BLOCK;
    let next_top = PAGE_HEIGHT - MARGIN;
    let pages = page_ranges(report.rows.len(), rows_fitting(first_top), rows_fitting(next_top));
    let page_count = pages.len();

    for (index, range) in pages.into_iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            new_page(&doc, index + 1)
        };

        let top = if index == 0 {
            layer.use_text(
                report.title.as_str(),
                TITLE_SIZE,
                Mm(MARGIN),
                Mm(PAGE_HEIGHT - MARGIN),
                &fonts.bold,
            );
            layer.use_text(
                format!("Records: {}", report.rows.len()),
                TEXT_SIZE,
                Mm(MARGIN),
                Mm(PAGE_HEIGHT - MARGIN - 7.0),
                &fonts.regular,
            );
            first_top
        } else {
            next_top
        };

        header_row(&layer, &fonts, report, col_width, top);
        let mut y = top;
        for row in &report.rows[range] {
            y -= ROW_HEIGHT;
            for (col, cell) in row.iter().enumerate() {
                let x = MARGIN + col_width * col as f32;
                layer.use_text(fit(&cell.to_string(), col_width), TEXT_SIZE, Mm(x), Mm(y), &fonts.regular);
            }
        }

        layer.use_text(
            format!("Page {} of {}", index + 1, page_count),
            TEXT_SIZE,
            Mm(PAGE_WIDTH - MARGIN - 25.0),
            Mm(MARGIN - 5.0),
            &fonts.regular,
        );

        if index + 1 == page_count && !report.summary.is_empty() {
            let summary_y = y - ROW_HEIGHT * 1.5;
            rule(&layer, summary_y + ROW_HEIGHT - 1.0);
            layer.use_text(super::summary_line(report), TEXT_SIZE, Mm(MARGIN), Mm(summary_y), &fonts.bold);
        }
    }

    doc.save_to_bytes().map_err(render_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportCell, SummaryEntry};

    #[test]
    fn test_page_ranges_split_rows() {
        assert_eq!(page_ranges(0, 20, 25), vec![0..0]);
        assert_eq!(page_ranges(20, 20, 25), vec![0..20]);
        assert_eq!(page_ranges(50, 20, 25), vec![0..20, 20..45, 45..50]);
    }

    #[test]
    fn test_fit_truncates_long_cells() {
        assert_eq!(fit("O+", 20.0), "O+");
        let long = "a".repeat(100);
        let fitted = fit(&long, 20.0);
        assert!(fitted.ends_with("..."));
        assert!(fitted.chars().count() < 20);
    }

    #[test]
    fn test_render_multi_page_report() {
        let report = TabularReport {
            title: "Donors".to_string(),
            columns: vec!["Name".to_string(), "Volume (ml)".to_string()],
            rows: (0..120)
                .map(|i| vec![ReportCell::from(format!("Donor {}", i)), ReportCell::from(450_i64)])
                .collect(),
            summary: vec![SummaryEntry::new("Total donors", 120_i64)],
        };
        let bytes = render_pdf(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
