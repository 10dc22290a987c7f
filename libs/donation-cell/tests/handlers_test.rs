use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use donation_cell::router::donation_routes;
use shared_database::AppState;
use shared_models::auth::UserType;
use shared_utils::test_utils::{Fixtures, JwtTestUtils, TestConfig};

struct Setup {
    state: AppState,
    secret: String,
    center_staff_id: i64,
    hospital_staff_id: i64,
    donor_id: i64,
    other_donor_id: i64,
}

async fn setup() -> Setup {
    let config = TestConfig::default();
    let state = config.to_state();
    let db = state.db.lock().await;
    let (_, center_staff_id) = Fixtures::blood_center(db.conn(), "Central Center");
    let (_, hospital_staff_id) = Fixtures::hospital(db.conn(), "St. Mary's");
    let donor_id = Fixtures::donor(db.conn(), "ana@bloodbank.test", "A+", Fixtures::adult_birth_date());
    let other_donor_id = Fixtures::donor(db.conn(), "ben@bloodbank.test", "B-", Fixtures::adult_birth_date());
    drop(db);

    Setup {
        state,
        secret: config.jwt_secret,
        center_staff_id,
        hospital_staff_id,
        donor_id,
        other_donor_id,
    }
}

impl Setup {
    fn app(&self) -> Router {
        donation_routes(self.state.clone())
    }

    fn center(&self) -> String {
        JwtTestUtils::bearer(self.center_staff_id, UserType::CenterStaff, &self.secret)
    }

    fn donor(&self, id: i64) -> String {
        JwtTestUtils::bearer(id, UserType::Donor, &self.secret)
    }

    async fn record(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .app()
            .oneshot(json_request("POST", "/", Some(&self.center()), body))
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }
}

fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", bearer);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", bearer)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_eligibility_is_public() {
    let s = setup().await;

    let response = s
        .app()
        .oneshot(json_request("POST", "/eligibility", None, json!({ "weight": 55, "volume_ml": 450 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["eligible"], false);
    assert_eq!(json["assessment"]["verdict"], "unsafe");
    assert_eq!(json["limits"]["max_ml"], 400);

    let response = s
        .app()
        .oneshot(json_request("POST", "/eligibility", None, json!({ "weight": 60, "volume_ml": 450 })))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["eligible"], true);
    assert_eq!(json["limits"]["recommended_ml"], 450);

    let response = s
        .app()
        .oneshot(json_request("POST", "/eligibility", None, json!({ "weight": 49.5 })))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["eligible"], false);
    assert_eq!(json["assessment"]["verdict"], "ineligible");
    assert!(json["limits"].is_null());

    let response = s
        .app()
        .oneshot(json_request("POST", "/eligibility", None, json!({ "volume_ml": 450 })))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["eligible"].is_null());

    let response = s
        .app()
        .oneshot(json_request("POST", "/eligibility", None, json!({ "weight": 0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_crud_requires_authentication() {
    let s = setup().await;
    let response = s
        .app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_center_records_donation() {
    let s = setup().await;

    let (status, json) = s
        .record(json!({
            "user_id": s.donor_id,
            "volume_ml": 450,
            "weight": 72.5,
            "screening_status": "passed",
            "notes": "  first visit  "
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["blood_group"], "A+");
    assert_eq!(json["screening_status"], "passed");
    assert_eq!(json["notes"], "first visit");

    let (status, json) = s
        .record(json!({ "user_id": s.donor_id, "volume_ml": 450, "weight": 55 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["volume_ml"].is_array());

    let (status, json) = s
        .record(json!({ "user_id": s.donor_id, "volume_ml": 300, "weight": 48 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["weight"].is_array());

    let (status, json) = s.record(json!({ "weight": 70 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["user_id"].is_array());
    assert!(json["fields"]["volume_ml"].is_array());
}

#[tokio::test]
async fn test_donors_see_only_their_donations() {
    let s = setup().await;
    s.record(json!({ "user_id": s.donor_id, "volume_ml": 450, "weight": 70 })).await;
    let (_, other) = s
        .record(json!({ "user_id": s.other_donor_id, "volume_ml": 450, "weight": 70 }))
        .await;

    let response = s
        .app()
        .oneshot(empty_request("GET", "/", &s.donor(s.donor_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["user_id"], s.donor_id);

    let response = s
        .app()
        .oneshot(empty_request("GET", &format!("/{}", other["id"]), &s.donor(s.donor_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = s
        .app()
        .oneshot(empty_request("GET", "/?search=ben", &s.center()))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["blood_group"], "B-");
}

#[tokio::test]
async fn test_hospital_staff_cannot_touch_donations() {
    let s = setup().await;
    let (_, created) = s
        .record(json!({ "user_id": s.donor_id, "volume_ml": 450, "weight": 70 }))
        .await;
    let hospital = JwtTestUtils::bearer(s.hospital_staff_id, UserType::HospitalStaff, &s.secret);

    let response = s.app().oneshot(empty_request("GET", "/", &hospital)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = s
        .app()
        .oneshot(empty_request("DELETE", &format!("/{}", created["id"]), &hospital))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = s
        .app()
        .oneshot(empty_request("DELETE", &format!("/{}", created["id"]), &s.center()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = s
        .app()
        .oneshot(empty_request("GET", &format!("/{}", created["id"]), &s.center()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
