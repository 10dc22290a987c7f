// =====================================================================================
// REPORT EXPORT SERVICE
// =====================================================================================

mod definitions;

pub use definitions::definition;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, instrument};

use shared_models::error::FieldErrors;
use shared_utils::scope::Scope;

use crate::models::{
    humanize, ReportError, ReportFile, ReportFilter, ReportFilters, ReportFormat, ReportType,
    TabularReport,
};
use crate::render;
use crate::repository;

pub struct ReportService;

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportService {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, conn, filters))]
    pub fn export(
        &self,
        conn: &Connection,
        scope: &Scope,
        report_type: ReportType,
        format: ReportFormat,
        filters: ReportFilters,
        today: NaiveDate,
    ) -> Result<ReportFile, ReportError> {
        let report = self.build(conn, scope, report_type, filters)?;
        let bytes = render::render(&report, format)?;

        info!("Exported {} report ({} rows) as {:?}", report_type, report.rows.len(), format);
        Ok(ReportFile {
            filename: format!(
                "{}_report_{}.{}",
                report_type.slug(),
                today.format("%Y%m%d"),
                format.extension()
            ),
            content_type: format.content_type(),
            bytes,
        })
    }

    /// Scope, validate and run the report query.
    pub fn build(
        &self,
        conn: &Connection,
        scope: &Scope,
        report_type: ReportType,
        filters: ReportFilters,
    ) -> Result<TabularReport, ReportError> {
        let filters = scoped_filters(scope, report_type, filters)?;
        let filters = applicable_filters(report_type, filters);
        validate(report_type, &filters)?;

        let labels = filter_labels(conn, report_type, &filters)?;
        let definition = definition(report_type);
        let rows = (definition.rows)(conn, &filters)?;

        Ok(TabularReport {
            title: title(report_type, &labels),
            columns: definition.columns.iter().map(|c| c.to_string()).collect(),
            summary: (definition.summary)(&rows),
            rows,
        })
    }
}

/// System users export anything. Hospital and center staff export the
/// reports about their own institution, with its filter forced.
fn scoped_filters(
    scope: &Scope,
    report_type: ReportType,
    mut filters: ReportFilters,
) -> Result<ReportFilters, ReportError> {
    match scope {
        Scope::System => Ok(filters),
        Scope::Hospital(id) if report_type.applies(ReportFilter::Hospital) => {
            filters.hospital_id = Some(*id);
            Ok(filters)
        }
        Scope::BloodCenter(id) if report_type.applies(ReportFilter::BloodCenter) => {
            filters.blood_center_id = Some(*id);
            Ok(filters)
        }
        _ => Err(ReportError::Forbidden),
    }
}

/// Drop filters the report does not support.
fn applicable_filters(report_type: ReportType, filters: ReportFilters) -> ReportFilters {
    let keep = |filter: ReportFilter| report_type.applies(filter);
    ReportFilters {
        start_date: filters.start_date.filter(|_| keep(ReportFilter::DateRange)),
        end_date: filters.end_date.filter(|_| keep(ReportFilter::DateRange)),
        hospital_id: filters.hospital_id.filter(|_| keep(ReportFilter::Hospital)),
        blood_center_id: filters.blood_center_id.filter(|_| keep(ReportFilter::BloodCenter)),
        status: filters
            .status
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && keep(ReportFilter::Status)),
        recipient_id: filters.recipient_id.filter(|_| keep(ReportFilter::Recipient)),
        blood_group_id: filters.blood_group_id.filter(|_| keep(ReportFilter::BloodGroup)),
    }
}

fn validate(report_type: ReportType, filters: &ReportFilters) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let (Some(start), Some(end)) = (filters.start_date, filters.end_date) {
        if start > end {
            errors.add("end_date", "The end date must be on or after the start date");
        }
    }
    if let Some(status) = filters.status.as_deref() {
        let allowed = report_type.statuses();
        if !allowed.contains(&status) {
            errors.add("status", format!("The status must be one of: {}", allowed.join(", ")));
        }
    }

    errors.into_result()
}

fn resolve(
    conn: &Connection,
    errors: &mut FieldErrors,
    field: &str,
    table: &str,
    id: Option<i64>,
) -> rusqlite::Result<Option<String>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let name = repository::lookup_name(conn, table, id)?;
    if name.is_none() {
        errors.add(field, format!("The selected {} is invalid", field));
    }
    Ok(name)
}

/// Human-readable labels of the active filters, in title order.
fn filter_labels(
    conn: &Connection,
    report_type: ReportType,
    filters: &ReportFilters,
) -> Result<Vec<String>, ReportError> {
    let mut errors = FieldErrors::new();
    let mut labels = Vec::new();

    if let Some(status) = filters.status.as_deref() {
        let prefix = match report_type {
            ReportType::Donations => "Screening",
            _ => "Status",
        };
        labels.push(format!("{}: {}", prefix, humanize(status)));
    }
    if let Some(name) = resolve(conn, &mut errors, "hospital_id", "hospitals", filters.hospital_id)? {
        labels.push(format!("Hospital: {}", name));
    }
    if let Some(name) = resolve(
        conn,
        &mut errors,
        "blood_center_id",
        "blood_centers",
        filters.blood_center_id,
    )? {
        labels.push(format!("Blood Center: {}", name));
    }
    if let Some(name) = resolve(conn, &mut errors, "recipient_id", "recipients", filters.recipient_id)? {
        labels.push(format!("Recipient: {}", name));
    }
    if let Some(name) = resolve(
        conn,
        &mut errors,
        "blood_group_id",
        "blood_groups",
        filters.blood_group_id,
    )? {
        labels.push(format!("Blood Group: {}", name));
    }
    if let Some(start) = filters.start_date {
        labels.push(format!("From: {}", start.format("%Y-%m-%d")));
    }
    if let Some(end) = filters.end_date {
        labels.push(format!("To: {}", end.format("%Y-%m-%d")));
    }

    errors.into_result()?;
    Ok(labels)
}

pub fn title(report_type: ReportType, labels: &[String]) -> String {
    std::iter::once(report_type.name().to_string())
        .chain(labels.iter().cloned())
        .collect::<Vec<_>>()
        .join(" | ")
}
