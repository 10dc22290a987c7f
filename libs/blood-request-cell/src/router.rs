use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn blood_request_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/",
            get(handlers::list_blood_requests).post(handlers::create_blood_request),
        )
        .route(
            "/{request_id}",
            get(handlers::get_blood_request)
                .put(handlers::update_blood_request)
                .delete(handlers::delete_blood_request),
        )
        .route("/{request_id}/approve", post(handlers::approve_blood_request))
        .route("/{request_id}/cancel", post(handlers::cancel_blood_request))
        .route(
            "/{request_id}/items/{item_id}/status",
            patch(handlers::update_item_status),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
