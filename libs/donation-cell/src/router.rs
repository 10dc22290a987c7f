use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn donation_routes(state: AppState) -> Router {
    let public_routes = Router::new().route("/eligibility", post(handlers::check_eligibility));

    let protected_routes = Router::new()
        .route("/", get(handlers::list_donations).post(handlers::create_donation))
        .route(
            "/{donation_id}",
            get(handlers::get_donation)
                .put(handlers::update_donation)
                .delete(handlers::delete_donation),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
