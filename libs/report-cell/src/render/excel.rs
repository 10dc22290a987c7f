use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::models::{ReportCell, ReportError, TabularReport};

const SHEET_NAME: &str = "Report";
const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 50;

impl From<XlsxError> for ReportError {
    fn from(err: XlsxError) -> Self {
        ReportError::Render(err.to_string())
    }
}

fn column_width(report: &TabularReport, col: usize) -> f64 {
    let widest = report
        .rows
        .iter()
        .filter_map(|row| row.get(col))
        .map(|cell| cell.to_string().chars().count())
        .chain(report.columns.get(col).map(|c| c.chars().count()))
        .max()
        .unwrap_or(MIN_COLUMN_WIDTH);
    (widest + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH) as f64
}

/// Title row, header row, data rows, then the summary row, on one sheet.
pub fn render_excel(report: &TabularReport) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let title_format = Format::new().set_bold().set_font_size(14);

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.write_string_with_format(0, 0, &report.title, &title_format)?;

    let header_row = 2;
    for (col, column) in report.columns.iter().enumerate() {
        sheet.write_string_with_format(header_row, col as u16, column, &bold)?;
        sheet.set_column_width(col as u16, column_width(report, col))?;
    }

    let mut row_index = header_row + 1;
    for row in &report.rows {
        for (col, cell) in row.iter().enumerate() {
            match cell {
                ReportCell::Text(text) => {
                    sheet.write_string(row_index, col as u16, text)?;
                }
                ReportCell::Number(n) => {
                    sheet.write_number(row_index, col as u16, *n)?;
                }
                ReportCell::Empty => {}
            }
        }
        row_index += 1;
    }

    if !report.summary.is_empty() {
        let summary_row = row_index + 1;
        for (index, entry) in report.summary.iter().enumerate() {
            let col = (index * 2) as u16;
            sheet.write_string_with_format(summary_row, col, &entry.label, &bold)?;
            match &entry.value {
                ReportCell::Number(n) => {
                    sheet.write_number_with_format(summary_row, col + 1, *n, &bold)?;
                }
                other => {
                    sheet.write_string_with_format(summary_row, col + 1, other.to_string(), &bold)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
