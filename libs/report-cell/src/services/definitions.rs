use rusqlite::Connection;

use crate::models::{ReportCell, ReportFilters, ReportType, SummaryEntry};
use crate::repository;

type Rows = Vec<Vec<ReportCell>>;

/// Columns, row query and summary of one report type.
pub struct ReportDefinition {
    pub columns: &'static [&'static str],
    pub rows: fn(&Connection, &ReportFilters) -> rusqlite::Result<Rows>,
    pub summary: fn(&[Vec<ReportCell>]) -> Vec<SummaryEntry>,
}

fn total(rows: &[Vec<ReportCell>], col: usize) -> f64 {
    rows.iter()
        .filter_map(|row| match row.get(col) {
            Some(ReportCell::Number(n)) => Some(*n),
            _ => None,
        })
        .sum()
}

fn count_where(rows: &[Vec<ReportCell>], col: usize, value: &str) -> i64 {
    rows.iter()
        .filter(|row| matches!(row.get(col), Some(ReportCell::Text(text)) if text == value))
        .count() as i64
}

pub fn definition(report_type: ReportType) -> ReportDefinition {
    match report_type {
        ReportType::Donors => ReportDefinition {
            columns: &[
                "Name",
                "Email",
                "Phone",
                "Gender",
                "Blood Group",
                "Date of Birth",
                "Donations",
                "Volume (ml)",
                "Registered",
            ],
            rows: repository::donor_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total donors", rows.len() as i64),
                    SummaryEntry::new("Total donations", total(rows, 6)),
                ]
            },
        },
        ReportType::Recipients => ReportDefinition {
            columns: &[
                "Name",
                "ID Number",
                "Hospital",
                "Blood Group",
                "Gender",
                "Date of Birth",
                "Request Items",
                "Units Requested",
                "Registered",
            ],
            rows: repository::recipient_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total recipients", rows.len() as i64),
                    SummaryEntry::new("Units requested", total(rows, 7)),
                ]
            },
        },
        ReportType::Hospitals => ReportDefinition {
            columns: &["Name", "Email", "Phone", "Address", "Requests", "Recipients", "Registered"],
            rows: repository::hospital_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total hospitals", rows.len() as i64),
                    SummaryEntry::new("Total requests", total(rows, 4)),
                ]
            },
        },
        ReportType::BloodCenters => ReportDefinition {
            columns: &[
                "Name",
                "Email",
                "Phone",
                "Address",
                "Donations",
                "Volume (ml)",
                "Appointments",
                "Registered",
            ],
            rows: repository::blood_center_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total blood centers", rows.len() as i64),
                    SummaryEntry::new("Total donations", total(rows, 4)),
                    SummaryEntry::new("Total volume (ml)", total(rows, 5)),
                ]
            },
        },
        ReportType::Appointments => ReportDefinition {
            columns: &["Donor", "Blood Center", "Date", "Status", "Notes"],
            rows: repository::appointment_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total appointments", rows.len() as i64),
                    SummaryEntry::new("Completed", count_where(rows, 3, "Completed")),
                ]
            },
        },
        ReportType::Requests => ReportDefinition {
            columns: &[
                "Request",
                "Hospital",
                "Request Date",
                "Status",
                "Items",
                "Units Requested",
                "Units Fulfilled",
                "Notes",
            ],
            rows: repository::request_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total requests", rows.len() as i64),
                    SummaryEntry::new("Units requested", total(rows, 5)),
                    SummaryEntry::new("Units fulfilled", total(rows, 6)),
                ]
            },
        },
        ReportType::Donations => ReportDefinition {
            columns: &[
                "Donor",
                "Blood Center",
                "Blood Group",
                "Volume (ml)",
                "Weight (kg)",
                "Date",
                "Screening",
                "Request Item",
            ],
            rows: repository::donation_rows,
            summary: |rows| {
                vec![
                    SummaryEntry::new("Total donations", rows.len() as i64),
                    SummaryEntry::new("Total volume (ml)", total(rows, 3)),
                    SummaryEntry::new("Passed screening", count_where(rows, 6, "Passed")),
                ]
            },
        },
    }
}
