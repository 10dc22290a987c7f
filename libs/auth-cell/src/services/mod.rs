pub mod account;

pub use account::{AccountError, AccountService, LoginResponse, UserProfile};
