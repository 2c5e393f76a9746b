//! Application-wide errors for failures outside the ledger rules
//! themselves, namely bearer-token authentication.

use serde_json::{Value, json};
use thiserror::Error;

use crate::jwt::JwtError;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// JSON body in the `{"error", "message"}` shape every endpoint uses.
    ///
    /// Server-side failures do not leak their detail.
    #[must_use]
    pub fn body(&self) -> Value {
        let message = match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Unauthorized(_) => self.to_string(),
        };
        json!({ "error": self.error_code(), "message": message })
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::Unauthorized("Token has expired".to_string()),
            JwtError::DecodingError(_) => Self::Unauthorized("Invalid token".to_string()),
            JwtError::EncodingError(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Unauthorized(String::new()), 401, "UNAUTHORIZED")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_jwt_errors_map_to_unauthorized() {
        let err: AppError = JwtError::Expired.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.to_string(), "Authentication failed: Token has expired");

        let err: AppError = JwtError::DecodingError("bad sig".into()).into();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }

    #[test]
    fn test_body_hides_internal_detail() {
        let body = AppError::Internal("signing key rejected by ring".into()).body();
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "An internal error occurred");

        let body = AppError::Unauthorized("Invalid token".into()).body();
        assert_eq!(body["message"], "Authentication failed: Invalid token");
    }
}
