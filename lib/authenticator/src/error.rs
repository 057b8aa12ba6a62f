//! Error types for the authenticator crate.
//!
//! Errors are carried in rootcause reports:
//! - `AuthenticatorError`: outcome of a handshake phase, reported to the host
//! - `CodecError`: challenge rendering failures
//! - `ResponseError`: failures writing to the host's response
//! - `RegistryError`: authenticator registration failures

use crate::context::HandshakeState;
use crate::gate::DenialReason;
use std::fmt;

/// How the host pipeline should treat an [`AuthenticatorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The phase could not be carried out.
    AuthenticationFailed,
    /// The handshake completed but the identity was rejected.
    InvalidCredentials,
}

/// Errors from handshake phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorError {
    /// A required request parameter is absent or empty.
    MissingParameter { name: &'static str },
    /// The correlation key is malformed or does not belong to the attempt.
    InvalidSessionKey { reason: String },
    /// The phase was invoked in the wrong handshake state.
    UnexpectedState { state: HandshakeState },
    /// The presentation page URL could not be built.
    UrlBuildFailed { details: String },
    /// The challenge artifact could not be rendered.
    ChallengeRenderFailed { details: String },
    /// The redirect could not be written to the user agent.
    RedirectFailed { details: String },
    /// Authorization was denied for the subject.
    InvalidCredentials {
        subject: String,
        reason: DenialReason,
    },
}

impl AuthenticatorError {
    /// Classifies the error for the host pipeline.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidCredentials { .. } => FailureKind::InvalidCredentials,
            _ => FailureKind::AuthenticationFailed,
        }
    }

    /// Returns the rejected identity for credential failures.
    #[must_use]
    pub fn rejected_subject(&self) -> Option<&str> {
        match self {
            Self::InvalidCredentials { subject, .. } => Some(subject),
            _ => None,
        }
    }
}

impl fmt::Display for AuthenticatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameter { name } => {
                write!(f, "missing request parameter: {name}")
            }
            Self::InvalidSessionKey { reason } => {
                write!(f, "invalid session key: {reason}")
            }
            Self::UnexpectedState { state } => {
                write!(f, "unexpected handshake state: {state}")
            }
            Self::UrlBuildFailed { details } => {
                write!(f, "error occurred when building the URL for the login page: {details}")
            }
            Self::ChallengeRenderFailed { details } => {
                write!(f, "error occurred when rendering the challenge: {details}")
            }
            Self::RedirectFailed { details } => {
                write!(f, "error occurred when redirecting the user to the login page: {details}")
            }
            Self::InvalidCredentials { subject, reason } => {
                write!(f, "authorization failed for '{subject}': {reason}")
            }
        }
    }
}

impl std::error::Error for AuthenticatorError {}

/// Errors from challenge rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The text cannot be encoded (too long for the symbol, etc.).
    EncodingFailed { details: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodingFailed { details } => write!(f, "encoding failed: {details}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Errors from writing to the host response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// A redirect was already sent for this response.
    AlreadyCommitted,
    /// The underlying transport failed.
    WriteFailed { details: String },
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCommitted => write!(f, "response already committed"),
            Self::WriteFailed { details } => write!(f, "response write failed: {details}"),
        }
    }
}

impl std::error::Error for ResponseError {}

/// Errors from the authenticator registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An authenticator with the same name is already registered.
    DuplicateAuthenticator { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateAuthenticator { name } => {
                write!(f, "authenticator '{name}' is already registered")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_carries_subject() {
        let err = AuthenticatorError::InvalidCredentials {
            subject: "bob@acme".to_string(),
            reason: DenialReason::RoleNotGranted {
                role: "photoSharingRole".to_string(),
            },
        };
        assert_eq!(err.kind(), FailureKind::InvalidCredentials);
        assert_eq!(err.rejected_subject(), Some("bob@acme"));
        assert!(err.to_string().contains("bob@acme"));
        assert!(err.to_string().contains("photoSharingRole"));
    }

    #[test]
    fn phase_errors_are_authentication_failures() {
        let errors = [
            AuthenticatorError::MissingParameter { name: "username" },
            AuthenticatorError::UrlBuildFailed {
                details: "relative URL without a base".to_string(),
            },
            AuthenticatorError::RedirectFailed {
                details: "broken pipe".to_string(),
            },
            AuthenticatorError::ChallengeRenderFailed {
                details: "data too long".to_string(),
            },
        ];
        for err in errors {
            assert_eq!(err.kind(), FailureKind::AuthenticationFailed);
            assert!(err.rejected_subject().is_none());
        }
    }

    #[test]
    fn url_and_redirect_failures_have_distinct_messages() {
        let url = AuthenticatorError::UrlBuildFailed {
            details: "x".to_string(),
        };
        let redirect = AuthenticatorError::RedirectFailed {
            details: "x".to_string(),
        };
        assert!(url.to_string().contains("building the URL"));
        assert!(redirect.to_string().contains("redirecting the user"));
    }

    #[test]
    fn registry_error_display() {
        let err = RegistryError::DuplicateAuthenticator {
            name: "qrcode".to_string(),
        };
        assert!(err.to_string().contains("'qrcode'"));
    }
}
