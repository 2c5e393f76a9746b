//! Shared types, errors, and configuration for Dealflow.
//!
//! This crate provides common pieces used across all other crates:
//! - Application-wide error types
//! - Configuration management
//! - Caller identity claims and JWT validation
//! - SMTP email transport
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::Claims;
pub use config::{AppConfig, EmailConfig, NotificationConfig};
pub use email::{EmailError, EmailService};
pub use error::AppError;
pub use jwt::{JwtConfig, JwtError, JwtService};
