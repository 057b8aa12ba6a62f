//! Host response seam.
//!
//! The authenticator never touches the transport. It hands the rendered
//! challenge and the redirect target to an [`AuthenticatorResponse`] that
//! the host turns into whatever its transport needs.

use crate::codec::Challenge;
use crate::error::ResponseError;
use qr_authenticator_core::SessionKey;
use rootcause::prelude::Report;
use url::Url;

/// Outbound side of a handshake phase.
pub trait AuthenticatorResponse: Send {
    /// Makes `challenge` available to the presentation page for `key`.
    fn publish_challenge(
        &mut self,
        key: &SessionKey,
        challenge: Challenge,
    ) -> Result<(), Report<ResponseError>>;

    /// Redirects the user agent to `location`.
    fn send_redirect(&mut self, location: &Url) -> Result<(), Report<ResponseError>>;
}

/// Response that records what the authenticator wrote.
///
/// Hosts read it back after the call and translate it to their transport.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    challenge: Option<(SessionKey, Challenge)>,
    redirect: Option<Url>,
}

impl BufferedResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the redirect target, if one was sent.
    #[must_use]
    pub fn redirect(&self) -> Option<&Url> {
        self.redirect.as_ref()
    }

    /// Returns the published challenge, if any.
    #[must_use]
    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref().map(|(_, challenge)| challenge)
    }

    /// Consumes the response, returning the published challenge and redirect.
    #[must_use]
    pub fn into_parts(self) -> (Option<(SessionKey, Challenge)>, Option<Url>) {
        (self.challenge, self.redirect)
    }
}

impl AuthenticatorResponse for BufferedResponse {
    fn publish_challenge(
        &mut self,
        key: &SessionKey,
        challenge: Challenge,
    ) -> Result<(), Report<ResponseError>> {
        self.challenge = Some((key.clone(), challenge));
        Ok(())
    }

    fn send_redirect(&mut self, location: &Url) -> Result<(), Report<ResponseError>> {
        if self.redirect.is_some() {
            return Err(ResponseError::AlreadyCommitted.into());
        }
        self.redirect = Some(location.clone());
        Ok(())
    }
}
