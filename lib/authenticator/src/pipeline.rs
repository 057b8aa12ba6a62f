//! The authenticator contract the host pipeline drives.
//!
//! Hosts call [`ApplicationAuthenticator::process`] for every request of an
//! attempt. The default implementation decides between issuing a challenge
//! and consuming a response, and handles retries.

use crate::context::{AuthenticationContext, HandshakeState};
use crate::error::AuthenticatorError;
use crate::request::AuthenticationRequest;
use crate::response::AuthenticatorResponse;
use async_trait::async_trait;
use qr_authenticator_core::SessionKey;
use rootcause::prelude::Report;
use tracing::{debug, info, warn};

/// Where an attempt stands after a call to [`ApplicationAuthenticator::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// A challenge was issued; the host must wait for the next request.
    Incomplete,
    /// The subject is authenticated.
    SuccessCompleted,
}

/// A pluggable authentication step.
#[async_trait]
pub trait ApplicationAuthenticator: Send + Sync {
    /// Stable registration name.
    fn name(&self) -> &str;

    /// Human-readable name.
    fn friendly_name(&self) -> &str;

    /// Returns true if `request` is a response this authenticator consumes.
    fn can_handle(&self, request: &AuthenticationRequest) -> bool;

    /// Issues a challenge and redirects the user agent to present it.
    fn initiate(
        &self,
        request: &AuthenticationRequest,
        context: &mut AuthenticationContext,
        response: &mut dyn AuthenticatorResponse,
    ) -> Result<(), Report<AuthenticatorError>>;

    /// Validates a response and authorizes its subject.
    async fn process_response(
        &self,
        request: &AuthenticationRequest,
        context: &mut AuthenticationContext,
    ) -> Result<(), Report<AuthenticatorError>>;

    /// Whether a failed response leads to a fresh challenge.
    fn retry_authentication_enabled(&self) -> bool;

    /// Returns the key identifying the attempt `request` belongs to.
    fn context_identifier(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<SessionKey, Report<AuthenticatorError>>;

    /// Runs one step of the attempt.
    async fn process(
        &self,
        request: &AuthenticationRequest,
        context: &mut AuthenticationContext,
        response: &mut dyn AuthenticatorResponse,
    ) -> Result<FlowStatus, Report<AuthenticatorError>> {
        if context.state().is_terminal() {
            return Err(AuthenticatorError::UnexpectedState {
                state: context.state(),
            }
            .into());
        }
        context.set_current_authenticator(self.name());

        if !self.can_handle(request) {
            debug!(authenticator = self.name(), "issuing challenge");
            return match self.initiate(request, context, response) {
                Ok(()) => Ok(FlowStatus::Incomplete),
                Err(e) => {
                    context.set_state(HandshakeState::Failed);
                    Err(e)
                }
            };
        }

        match self.process_response(request, context).await {
            Ok(()) => {
                context.set_retrying(false);
                context.set_state(HandshakeState::Succeeded);
                info!(authenticator = self.name(), "authentication completed");
                Ok(FlowStatus::SuccessCompleted)
            }
            Err(e) if self.retry_authentication_enabled() => {
                warn!(
                    authenticator = self.name(),
                    error = %e,
                    retry_count = context.retry_count() + 1,
                    "response rejected, retrying"
                );
                context.record_retry(e.current_context().to_string());
                match self.initiate(request, context, response) {
                    Ok(()) => Ok(FlowStatus::Incomplete),
                    Err(e) => {
                        context.set_state(HandshakeState::Failed);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                warn!(authenticator = self.name(), error = %e, "response rejected");
                context.set_state(HandshakeState::Failed);
                Err(e)
            }
        }
    }
}
