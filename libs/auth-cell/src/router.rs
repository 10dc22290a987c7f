use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn auth_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/validate", post(handlers::validate))
        .route("/verify", post(handlers::verify));

    let protected_routes = Router::new()
        .route("/profile", get(handlers::profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
