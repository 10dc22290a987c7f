use axum::{
    extract::{Extension, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::scope::resolve_scope;

use crate::models::{ReportFilters, ReportFormat, ReportType};
use crate::services::ReportService;

#[axum::debug_handler]
pub async fn export_report(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((report_type, format)): Path<(String, String)>,
    Query(filters): Query<ReportFilters>,
) -> Result<Response, AppError> {
    let report_type: ReportType = report_type.parse()?;
    let format: ReportFormat = format.parse()?;
    debug!("User {} exporting {} report as {:?}", user.id, report_type, format);

    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;
    let file = ReportService::new().export(
        db.conn(),
        &scope,
        report_type,
        format,
        filters,
        Utc::now().date_naive(),
    )?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
