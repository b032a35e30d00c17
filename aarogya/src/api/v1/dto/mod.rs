//! v1 API Data Transfer Objects.
//!
//! Wire shapes for the REST API, kept apart from the domain models in
//! `src/models/` so the two can evolve separately.

pub mod auth;
pub mod med;

pub use auth::*;
pub use med::*;
