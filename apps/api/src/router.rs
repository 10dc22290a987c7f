use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use blood_request_cell::router::blood_request_routes;
use dashboard_cell::dashboard_routes;
use donation_cell::router::donation_routes;
use registry_cell::{
    blood_center_routes, blood_group_routes, donor_routes, hospital_routes, recipient_routes,
};
use report_cell::report_routes;
use shared_database::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Blood Bank API is running!" }))
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/blood-groups", blood_group_routes(state.clone()))
        .nest("/donors", donor_routes(state.clone()))
        .nest("/hospitals", hospital_routes(state.clone()))
        .nest("/blood-centers", blood_center_routes(state.clone()))
        .nest("/recipients", recipient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/donations", donation_routes(state.clone()))
        .nest("/blood-requests", blood_request_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state.clone()))
        .nest("/reports", report_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_and_nested_auth_guard() {
        let state = TestConfig::default().to_state();

        let response = create_router(state.clone())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = create_router(state)
            .oneshot(Request::builder().uri("/blood-requests").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
