use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use shared_database::AppState;
use shared_models::auth::UserType;
use shared_utils::test_utils::{Fixtures, JwtTestUtils, TestConfig};

struct Setup {
    state: AppState,
    secret: String,
    donor_id: i64,
    center_id: i64,
    center_staff_id: i64,
    other_center_staff_id: i64,
    hospital_staff_id: i64,
}

async fn setup() -> Setup {
    let config = TestConfig::default();
    let state = config.to_state();
    let db = state.db.lock().await;
    let donor_id = Fixtures::donor(db.conn(), "donor@bloodbank.test", "O+", Fixtures::adult_birth_date());
    let (center_id, center_staff_id) = Fixtures::blood_center(db.conn(), "Central Center");
    let (_, other_center_staff_id) = Fixtures::blood_center(db.conn(), "North Center");
    let (_, hospital_staff_id) = Fixtures::hospital(db.conn(), "St. Mary's");
    drop(db);

    Setup {
        state,
        secret: config.jwt_secret,
        donor_id,
        center_id,
        center_staff_id,
        other_center_staff_id,
        hospital_staff_id,
    }
}

impl Setup {
    fn app(&self) -> Router {
        appointment_routes(self.state.clone())
    }

    fn token(&self, user_id: i64, user_type: UserType) -> String {
        JwtTestUtils::bearer(user_id, user_type, &self.secret)
    }

    fn donor(&self) -> String {
        self.token(self.donor_id, UserType::Donor)
    }

    fn center(&self) -> String {
        self.token(self.center_staff_id, UserType::CenterStaff)
    }

    async fn book(&self) -> Value {
        let payload = json!({
            "blood_center_id": self.center_id,
            "appointment_date": (Utc::now() + Duration::days(3)).to_rfc3339(),
            "notes": "Morning slot"
        });
        let response = self.app().oneshot(request("POST", "/", &self.donor(), Some(payload))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    async fn set_status(&self, id: i64, bearer: &str, status: &str) -> axum::response::Response {
        self.app()
            .oneshot(request(
                "PATCH",
                &format!("/{}/status", id),
                bearer,
                Some(json!({ "status": status })),
            ))
            .await
            .unwrap()
    }
}

fn request(method: &str, uri: &str, bearer: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", bearer);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_donor_books_for_themselves() {
    let s = setup().await;
    let json = s.book().await;

    assert_eq!(json["status"], "scheduled");
    assert_eq!(json["user_id"], s.donor_id);
    assert_eq!(json["blood_center_name"], "Central Center");
    assert_eq!(json["notes"], "Morning slot");
}

#[tokio::test]
async fn test_booking_in_the_past_is_rejected() {
    let s = setup().await;
    let payload = json!({
        "blood_center_id": s.center_id,
        "appointment_date": (Utc::now() - Duration::days(1)).to_rfc3339()
    });

    let response = s.app().oneshot(request("POST", "/", &s.donor(), Some(payload))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(response).await["fields"]["appointment_date"].is_array());
}

#[tokio::test]
async fn test_center_confirms_with_legacy_status_name() {
    let s = setup().await;
    let id = s.book().await["id"].as_i64().unwrap();

    let response = s.set_status(id, &s.center(), "accepted").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "confirmed");

    let response = s.set_status(id, &s.center(), "completed").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = s.set_status(id, &s.center(), "pending").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = s
        .app()
        .oneshot(request("PUT", &format!("/{}", id), &s.center(), Some(json!({ "notes": "late" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_donor_may_only_cancel() {
    let s = setup().await;
    let id = s.book().await["id"].as_i64().unwrap();

    let response = s.set_status(id, &s.donor(), "completed").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = s.set_status(id, &s.donor(), "cancelled").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");
}

#[tokio::test]
async fn test_access_is_scoped_to_center_and_donor() {
    let s = setup().await;
    let id = s.book().await["id"].as_i64().unwrap();

    let other_center = s.token(s.other_center_staff_id, UserType::CenterStaff);
    let response = s.app().oneshot(request("GET", &format!("/{}", id), &other_center, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let hospital = s.token(s.hospital_staff_id, UserType::HospitalStaff);
    let response = s.app().oneshot(request("GET", "/", &hospital, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = s.app().oneshot(request("GET", "/?status=scheduled", &s.center(), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["id"], id);

    let response = s.app().oneshot(request("GET", "/", &other_center, None)).await.unwrap();
    assert_eq!(body_json(response).await["meta"]["total"], 0);
}

#[tokio::test]
async fn test_center_staff_deletes_appointment() {
    let s = setup().await;
    let id = s.book().await["id"].as_i64().unwrap();

    let response = s.app().oneshot(request("DELETE", &format!("/{}", id), &s.donor(), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = s.app().oneshot(request("DELETE", &format!("/{}", id), &s.center(), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = s.app().oneshot(request("GET", &format!("/{}", id), &s.center(), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
