pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;
pub mod status;

pub use models::*;
pub use router::blood_request_routes;
