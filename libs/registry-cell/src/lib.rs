pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use router::{
    blood_center_routes, blood_group_routes, donor_routes, hospital_routes, recipient_routes,
};
