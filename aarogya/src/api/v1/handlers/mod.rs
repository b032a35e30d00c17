pub mod auth;
pub(crate) mod health;
pub mod med;

pub use health::health_check;
