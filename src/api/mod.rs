pub mod auth;
pub mod client;
pub mod endpoints;

pub use auth::TgtManager;
pub use client::EpiasClient;
pub use endpoints::{Endpoint, RequestMethod};
