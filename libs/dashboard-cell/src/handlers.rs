use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::scope::resolve_scope;

use crate::models::Dashboard;
use crate::services::DashboardService;

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Dashboard>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let dashboard = DashboardService::new().build(db.conn(), &scope, Utc::now())?;
    Ok(Json(dashboard))
}
