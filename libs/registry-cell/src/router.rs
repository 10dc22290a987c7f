use axum::{middleware, routing::get, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn blood_group_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_blood_groups))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}

pub fn donor_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_donors).post(handlers::create_donor))
        .route(
            "/{donor_id}",
            get(handlers::get_donor)
                .put(handlers::update_donor)
                .delete(handlers::delete_donor),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}

pub fn hospital_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_hospitals).post(handlers::create_hospital))
        .route(
            "/{hospital_id}",
            get(handlers::get_hospital)
                .put(handlers::update_hospital)
                .delete(handlers::delete_hospital),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}

pub fn blood_center_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_blood_centers).post(handlers::create_blood_center))
        .route(
            "/{blood_center_id}",
            get(handlers::get_blood_center)
                .put(handlers::update_blood_center)
                .delete(handlers::delete_blood_center),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}

pub fn recipient_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_recipients).post(handlers::create_recipient))
        .route(
            "/{recipient_id}",
            get(handlers::get_recipient)
                .put(handlers::update_recipient)
                .delete(handlers::delete_recipient),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
