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
    BloodRequestDetail, BloodRequestQuery, BloodRequestSummary, CreateBloodRequest,
    ItemStatusChange, UpdateBloodRequest,
};
use crate::services::{BloodRequestLifecycleService, BloodRequestQueryService};

// ==============================================================================
// READS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_blood_requests(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<BloodRequestQuery>,
) -> Result<Json<Paginated<BloodRequestSummary>>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let page = BloodRequestQueryService::new().list(db.conn(), &scope, &query)?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_blood_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<i64>,
) -> Result<Json<BloodRequestDetail>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let detail = BloodRequestQueryService::new().show(db.conn(), &scope, request_id)?;
    Ok(Json(detail))
}

// ==============================================================================
// LIFECYCLE COMMANDS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_blood_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateBloodRequest>,
) -> Result<(StatusCode, Json<BloodRequestDetail>), AppError> {
    debug!("User {} creating blood request", user.id);

    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let detail = BloodRequestLifecycleService::new().create_with_items(&mut db, &scope, payload)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[axum::debug_handler]
pub async fn update_blood_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<i64>,
    Json(payload): Json<UpdateBloodRequest>,
) -> Result<Json<BloodRequestDetail>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let detail =
        BloodRequestLifecycleService::new().update_with_items(&mut db, &scope, request_id, payload)?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn delete_blood_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    BloodRequestLifecycleService::new().delete(&mut db, &scope, request_id)?;
    Ok(Json(json!({ "message": "Blood request deleted successfully" })))
}

#[axum::debug_handler]
pub async fn approve_blood_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<i64>,
) -> Result<Json<BloodRequestDetail>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let detail = BloodRequestLifecycleService::new().approve(&mut db, &scope, request_id)?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn cancel_blood_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<i64>,
) -> Result<Json<BloodRequestDetail>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let detail = BloodRequestLifecycleService::new().cancel(&mut db, &scope, request_id)?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn update_item_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((request_id, item_id)): Path<(i64, i64)>,
    Json(change): Json<ItemStatusChange>,
) -> Result<Json<BloodRequestDetail>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let detail = BloodRequestLifecycleService::new().set_item_status(
        &mut db,
        &scope,
        request_id,
        item_id,
        change.status,
    )?;
    Ok(Json(detail))
}
