pub mod eligibility;
pub mod recording;

pub use recording::DonationService;
