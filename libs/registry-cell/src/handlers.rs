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
    BloodGroup, Donor, DonorPayload, DonorQuery, DonorResponse, Institution, InstitutionKind,
    InstitutionPayload, InstitutionQuery, Recipient, RecipientPayload, RecipientQuery,
};
use crate::repository;
use crate::services::{DonorService, InstitutionService, RecipientService};

// ==============================================================================
// BLOOD GROUPS
// ==============================================================================

pub async fn list_blood_groups(State(state): State<AppState>) -> Result<Json<Vec<BloodGroup>>, AppError> {
    let db = state.db.lock().await;
    let groups = repository::list_blood_groups(db.conn()).map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(groups))
}

// ==============================================================================
// DONORS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_donors(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<DonorQuery>,
) -> Result<Json<Paginated<Donor>>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let page = DonorService::new().list(db.conn(), &scope, &query)?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_donor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<DonorPayload>,
) -> Result<(StatusCode, Json<DonorResponse>), AppError> {
    debug!("User {} registering donor", user.id);

    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let donor = DonorService::new().create(&mut db, &scope, payload)?;
    Ok((StatusCode::CREATED, Json(donor)))
}

#[axum::debug_handler]
pub async fn get_donor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(donor_id): Path<i64>,
) -> Result<Json<Donor>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let donor = DonorService::new().show(db.conn(), &scope, donor_id)?;
    Ok(Json(donor))
}

#[axum::debug_handler]
pub async fn update_donor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(donor_id): Path<i64>,
    Json(payload): Json<DonorPayload>,
) -> Result<Json<DonorResponse>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let donor = DonorService::new().update(&mut db, &scope, donor_id, payload)?;
    Ok(Json(donor))
}

#[axum::debug_handler]
pub async fn delete_donor(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(donor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    DonorService::new().delete(&mut db, &scope, donor_id)?;
    Ok(Json(json!({ "message": "Donor deleted successfully" })))
}

// ==============================================================================
// HOSPITALS AND BLOOD CENTERS
// ==============================================================================

async fn list_institutions(
    state: AppState,
    kind: InstitutionKind,
    query: InstitutionQuery,
) -> Result<Json<Paginated<Institution>>, AppError> {
    let db = state.db.lock().await;
    let page = InstitutionService::new(&state.config, kind).list(db.conn(), &query)?;
    Ok(Json(page))
}

async fn create_institution(
    state: AppState,
    user: User,
    kind: InstitutionKind,
    payload: InstitutionPayload,
) -> Result<(StatusCode, Json<Institution>), AppError> {
    debug!("User {} creating {}", user.id, kind.table());

    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let institution = InstitutionService::new(&state.config, kind).create(&mut db, &scope, payload)?;
    Ok((StatusCode::CREATED, Json(institution)))
}

async fn get_institution(state: AppState, kind: InstitutionKind, id: i64) -> Result<Json<Institution>, AppError> {
    let db = state.db.lock().await;
    let institution = InstitutionService::new(&state.config, kind).show(db.conn(), id)?;
    Ok(Json(institution))
}

async fn update_institution(
    state: AppState,
    user: User,
    kind: InstitutionKind,
    id: i64,
    payload: InstitutionPayload,
) -> Result<Json<Institution>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let institution = InstitutionService::new(&state.config, kind).update(&mut db, &scope, id, payload)?;
    Ok(Json(institution))
}

async fn delete_institution(
    state: AppState,
    user: User,
    kind: InstitutionKind,
    id: i64,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    InstitutionService::new(&state.config, kind).delete(&mut db, &scope, id)?;
    Ok(Json(json!({ "message": format!("{} deleted successfully", kind.label()) })))
}

pub async fn list_hospitals(
    State(state): State<AppState>,
    Query(query): Query<InstitutionQuery>,
) -> Result<Json<Paginated<Institution>>, AppError> {
    list_institutions(state, InstitutionKind::Hospital, query).await
}

pub async fn create_hospital(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<InstitutionPayload>,
) -> Result<(StatusCode, Json<Institution>), AppError> {
    create_institution(state, user, InstitutionKind::Hospital, payload).await
}

pub async fn get_hospital(
    State(state): State<AppState>,
    Path(hospital_id): Path<i64>,
) -> Result<Json<Institution>, AppError> {
    get_institution(state, InstitutionKind::Hospital, hospital_id).await
}

pub async fn update_hospital(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(hospital_id): Path<i64>,
    Json(payload): Json<InstitutionPayload>,
) -> Result<Json<Institution>, AppError> {
    update_institution(state, user, InstitutionKind::Hospital, hospital_id, payload).await
}

pub async fn delete_hospital(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(hospital_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    delete_institution(state, user, InstitutionKind::Hospital, hospital_id).await
}

pub async fn list_blood_centers(
    State(state): State<AppState>,
    Query(query): Query<InstitutionQuery>,
) -> Result<Json<Paginated<Institution>>, AppError> {
    list_institutions(state, InstitutionKind::BloodCenter, query).await
}

pub async fn create_blood_center(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<InstitutionPayload>,
) -> Result<(StatusCode, Json<Institution>), AppError> {
    create_institution(state, user, InstitutionKind::BloodCenter, payload).await
}

pub async fn get_blood_center(
    State(state): State<AppState>,
    Path(blood_center_id): Path<i64>,
) -> Result<Json<Institution>, AppError> {
    get_institution(state, InstitutionKind::BloodCenter, blood_center_id).await
}

pub async fn update_blood_center(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(blood_center_id): Path<i64>,
    Json(payload): Json<InstitutionPayload>,
) -> Result<Json<Institution>, AppError> {
    update_institution(state, user, InstitutionKind::BloodCenter, blood_center_id, payload).await
}

pub async fn delete_blood_center(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(blood_center_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    delete_institution(state, user, InstitutionKind::BloodCenter, blood_center_id).await
}

// ==============================================================================
// RECIPIENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_recipients(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<RecipientQuery>,
) -> Result<Json<Paginated<Recipient>>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let page = RecipientService::new().list(db.conn(), &scope, &query)?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<RecipientPayload>,
) -> Result<(StatusCode, Json<Recipient>), AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let recipient = RecipientService::new().create(&mut db, &scope, payload)?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

#[axum::debug_handler]
pub async fn get_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(recipient_id): Path<i64>,
) -> Result<Json<Recipient>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let recipient = RecipientService::new().show(db.conn(), &scope, recipient_id)?;
    Ok(Json(recipient))
}

#[axum::debug_handler]
pub async fn update_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(recipient_id): Path<i64>,
    Json(payload): Json<RecipientPayload>,
) -> Result<Json<Recipient>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let recipient = RecipientService::new().update(&mut db, &scope, recipient_id, payload)?;
    Ok(Json(recipient))
}

#[axum::debug_handler]
pub async fn delete_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(recipient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    RecipientService::new().delete(&mut db, &scope, recipient_id)?;
    Ok(Json(json!({ "message": "Recipient deleted successfully" })))
}
