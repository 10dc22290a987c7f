use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route(
            "/",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route(
            "/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
