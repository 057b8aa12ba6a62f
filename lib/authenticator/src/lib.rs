//! QR-code second-factor authenticator for a federated login pipeline.
//!
//! This crate provides:
//! - The two-phase handshake (`QrAuthenticator`, `ApplicationAuthenticator`)
//! - Session key correlation (`SessionCorrelator`)
//! - Challenge rendering (`ChallengeCodec`, `QrCodec`)
//! - Tenant-aware role authorization (`AuthorizationGate`)
//! - Authenticator registration (`AuthenticatorRegistry`)
//!
//! # Handshake
//!
//! The host calls [`ApplicationAuthenticator::process`] for every request of
//! an attempt. A request without the `proceedAuthorization` marker starts
//! the attempt: the session key is rendered as a QR code and the user agent
//! is redirected to the presentation page. The scanning device answers with
//! the marker and a `username`, which must hold the configured role in its
//! tenant. Denied responses lead to a fresh challenge carrying a failure
//! banner.
//!
//! # Example
//!
//! ```
//! use qr_authenticator::{
//!     ApplicationAuthenticator, AuthenticationContext, AuthenticationRequest,
//!     AuthenticatorConfig, BufferedResponse, HandshakeState, QrAuthenticator,
//! };
//! use qr_authenticator_core::SessionKey;
//! use qr_authenticator_directory::{StaticDirectory, StaticDirectoryConfig, TenantConfig};
//! use std::sync::Arc;
//!
//! let directory = StaticDirectory::from_config(&StaticDirectoryConfig {
//!     tenants: vec![TenantConfig::new("acme").with_user("bob", &["photoSharingRole"])],
//! });
//! let authenticator =
//!     QrAuthenticator::new(&AuthenticatorConfig::default(), Arc::new(directory));
//!
//! let key = SessionKey::generate();
//! let mut context = AuthenticationContext::new(key.clone(), "oidc");
//! let request = AuthenticationRequest::new().with_param("sessionDataKey", key.as_str());
//! let mut response = BufferedResponse::new();
//!
//! authenticator
//!     .initiate(&request, &mut context, &mut response)
//!     .expect("challenge issued");
//!
//! assert_eq!(context.state(), HandshakeState::AwaitingChallengeResponse);
//! assert!(response.redirect().is_some());
//! ```

pub mod authenticator;
pub mod codec;
pub mod config;
pub mod context;
pub mod correlator;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod registry;
pub mod request;
pub mod response;
pub mod subject;

// Re-export main types at crate root
pub use authenticator::QrAuthenticator;
pub use codec::{Challenge, ChallengeCodec, QrCodec};
pub use config::{
    AuthenticatorConfig, AuthenticatorConfigBuilder, ErrorCorrection, HandlingMode, QrConfig,
};
pub use context::{AuthenticationContext, HandshakeState, SubjectBinding};
pub use correlator::SessionCorrelator;
pub use error::{AuthenticatorError, CodecError, FailureKind, RegistryError, ResponseError};
pub use gate::{AuthorizationDecision, AuthorizationGate, DenialReason};
pub use pipeline::{ApplicationAuthenticator, FlowStatus};
pub use registry::{AuthenticatorDescriptor, AuthenticatorRegistry};
pub use request::AuthenticationRequest;
pub use response::{AuthenticatorResponse, BufferedResponse};
pub use subject::Subject;
