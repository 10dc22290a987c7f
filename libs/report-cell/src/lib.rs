pub mod handlers;
pub mod models;
pub mod render;
pub mod repository;
pub mod router;
pub mod services;

pub use router::report_routes;
