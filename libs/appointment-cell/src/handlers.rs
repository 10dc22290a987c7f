use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::pagination::Paginated;
use shared_utils::scope::resolve_scope;

use crate::models::{
    Appointment, AppointmentQuery, AppointmentStatusRequest, BookAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::AppointmentService;

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Paginated<Appointment>>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let page = AppointmentService::new().list(db.conn(), &scope, &query)?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    debug!("User {} booking appointment", user.id);

    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let appointment = AppointmentService::new().book(db.conn(), &scope, request)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Appointment>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let appointment = AppointmentService::new().show(db.conn(), &scope, appointment_id)?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let appointment = AppointmentService::new().update(db.conn(), &scope, appointment_id, request)?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<AppointmentStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let appointment =
        AppointmentService::new().change_status(db.conn(), &scope, appointment_id, request.status)?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    AppointmentService::new().delete(db.conn(), &scope, appointment_id)?;
    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}
