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
    CreateDonation, Donation, DonationQuery, EligibilityRequest, EligibilityResponse, UpdateDonation,
};
use crate::services::DonationService;

pub async fn check_eligibility(
    Json(request): Json<EligibilityRequest>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let response = DonationService::new().check_eligibility(&request)?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn list_donations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<DonationQuery>,
) -> Result<Json<Paginated<Donation>>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let page = DonationService::new().list(db.conn(), &scope, &query)?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_donation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateDonation>,
) -> Result<(StatusCode, Json<Donation>), AppError> {
    debug!("User {} recording donation", user.id);

    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let donation = DonationService::new().create(&mut db, &scope, payload)?;
    Ok((StatusCode::CREATED, Json(donation)))
}

#[axum::debug_handler]
pub async fn get_donation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(donation_id): Path<i64>,
) -> Result<Json<Donation>, AppError> {
    let db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let donation = DonationService::new().show(db.conn(), &scope, donation_id)?;
    Ok(Json(donation))
}

#[axum::debug_handler]
pub async fn update_donation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(donation_id): Path<i64>,
    Json(payload): Json<UpdateDonation>,
) -> Result<Json<Donation>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    let donation = DonationService::new().update(&mut db, &scope, donation_id, payload)?;
    Ok(Json(donation))
}

#[axum::debug_handler]
pub async fn delete_donation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(donation_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.lock().await;
    let scope = resolve_scope(db.conn(), &user)?;

    DonationService::new().delete(&mut db, &scope, donation_id)?;
    Ok(Json(json!({ "message": "Donation deleted successfully" })))
}
