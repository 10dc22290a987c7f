//! Turns a [`TabularReport`] into downloadable bytes.

mod excel;
mod pdf;

pub use excel::render_excel;
pub use pdf::{page_ranges, render_pdf};

use crate::models::{ReportError, ReportFormat, TabularReport};

pub fn render(report: &TabularReport, format: ReportFormat) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Pdf => render_pdf(report),
        ReportFormat::Excel => render_excel(report),
    }
}

/// One line of `label: value` pairs.
pub(crate) fn summary_line(report: &TabularReport) -> String {
    report
        .summary
        .iter()
        .map(|entry| format!("{}: {}", entry.label, entry.value))
        .collect::<Vec<_>>()
        .join("    ")
}
