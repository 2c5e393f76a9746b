//! Request middleware and extractors.

pub mod auth;
pub mod extract;

pub use auth::{AuthUser, auth_middleware};
pub use extract::{ApiJson, ApiPath, ApiQuery};
