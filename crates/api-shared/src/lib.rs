//! # API Shared
//!
//! Shared request/response types for CXR APIs.
//!
//! Contains:
//! - Serde DTOs with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
