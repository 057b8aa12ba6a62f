//! HTTP-facing errors.
//!
//! Internal details are logged; responses carry generic messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qr_authenticator::{AuthenticatorError, FailureKind};
use qr_authenticator_core::SessionKey;
use rootcause::prelude::Report;
use std::fmt;

/// Errors returned by route handlers.
#[derive(Debug)]
pub enum ServerError {
    /// No live attempt has this key.
    AttemptNotFound { session_key: SessionKey },
    /// The attempt outlived its TTL.
    AttemptExpired { session_key: SessionKey },
    /// Another request is working on the attempt.
    AttemptBusy { session_key: SessionKey },
    /// The attempt has no rendered challenge.
    ChallengeNotIssued { session_key: SessionKey },
    /// No authenticator is registered under this name.
    AuthenticatorNotFound { name: String },
    /// The authenticator rejected the request.
    Authentication { error: AuthenticatorError },
    /// The authenticator finished without producing a redirect.
    MissingRedirect,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptNotFound { session_key } => {
                write!(f, "login attempt '{session_key}' not found")
            }
            Self::AttemptExpired { session_key } => {
                write!(f, "login attempt '{session_key}' has expired")
            }
            Self::AttemptBusy { session_key } => {
                write!(f, "login attempt '{session_key}' is already being processed")
            }
            Self::ChallengeNotIssued { session_key } => {
                write!(f, "no challenge issued for login attempt '{session_key}'")
            }
            Self::AuthenticatorNotFound { name } => {
                write!(f, "authenticator '{name}' is not registered")
            }
            Self::Authentication { error } => write!(f, "{error}"),
            Self::MissingRedirect => write!(f, "authenticator did not redirect"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<Report<AuthenticatorError>> for ServerError {
    fn from(report: Report<AuthenticatorError>) -> Self {
        Self::Authentication {
            error: report.current_context().clone(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::AttemptNotFound { .. } => (StatusCode::NOT_FOUND, "Login attempt not found"),
            Self::AttemptExpired { .. } => (StatusCode::GONE, "Login attempt expired"),
            Self::AttemptBusy { .. } => (StatusCode::CONFLICT, "Login attempt is busy"),
            Self::ChallengeNotIssued { .. } => (StatusCode::NOT_FOUND, "No challenge issued"),
            Self::Authentication { error } => match error {
                AuthenticatorError::MissingParameter { .. }
                | AuthenticatorError::InvalidSessionKey { .. } => {
                    (StatusCode::BAD_REQUEST, "Invalid login request")
                }
                AuthenticatorError::UnexpectedState { .. } => {
                    (StatusCode::CONFLICT, "Login attempt is not awaiting a response")
                }
                _ if error.kind() == FailureKind::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Authentication failed")
                }
                _ => {
                    tracing::error!(error = %error, "authentication step failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
                }
            },
            Self::AuthenticatorNotFound { .. } | Self::MissingRedirect => {
                tracing::error!(error = %self, "login pipeline misconfigured");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
