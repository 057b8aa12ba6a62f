//! Session key correlation between the two handshake phases.
//!
//! The key is read from the inbound request in both phases and embedded in
//! the presentation page URL, so the page and the return leg carry the same
//! value. Nothing is signed; the key is only as strong as the host makes it.

use crate::context::AuthenticationContext;
use crate::error::AuthenticatorError;
use crate::request::{
    AUTH_FAILURE, AUTH_FAILURE_MSG, AuthenticationRequest, LOGIN_FAIL_MESSAGE, SESSION_DATA_KEY,
};
use qr_authenticator_core::SessionKey;
use rootcause::prelude::Report;
use url::Url;

/// Longest accepted session key, in bytes.
pub const MAX_SESSION_KEY_LEN: usize = 256;

/// Reads session keys and composes presentation page URLs.
#[derive(Debug, Clone)]
pub struct SessionCorrelator {
    public_base_url: String,
    presentation_page: String,
}

impl SessionCorrelator {
    /// Creates a correlator for the given page location.
    ///
    /// The location is not validated here; a bad value surfaces as
    /// [`AuthenticatorError::UrlBuildFailed`] when a URL is first built.
    #[must_use]
    pub fn new(public_base_url: impl Into<String>, presentation_page: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            presentation_page: presentation_page.into(),
        }
    }

    /// Reads and validates the session key carried by `request`.
    pub fn session_key(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<SessionKey, Report<AuthenticatorError>> {
        let raw = request
            .param(SESSION_DATA_KEY)
            .ok_or(AuthenticatorError::MissingParameter {
                name: SESSION_DATA_KEY,
            })?;

        if raw.is_empty() {
            return Err(AuthenticatorError::InvalidSessionKey {
                reason: "empty".to_string(),
            }
            .into());
        }
        if raw.len() > MAX_SESSION_KEY_LEN {
            return Err(AuthenticatorError::InvalidSessionKey {
                reason: format!("longer than {MAX_SESSION_KEY_LEN} bytes"),
            }
            .into());
        }
        if raw.chars().any(char::is_control) {
            return Err(AuthenticatorError::InvalidSessionKey {
                reason: "contains control characters".to_string(),
            }
            .into());
        }

        Ok(SessionKey::from(raw))
    }

    /// Reads the session key and checks that it belongs to `context`.
    pub fn correlate(
        &self,
        request: &AuthenticationRequest,
        context: &AuthenticationContext,
    ) -> Result<SessionKey, Report<AuthenticatorError>> {
        let key = self.session_key(request)?;
        if &key != context.session_key() {
            return Err(AuthenticatorError::InvalidSessionKey {
                reason: "does not belong to this attempt".to_string(),
            }
            .into());
        }
        Ok(key)
    }

    /// Builds the presentation page URL for `key`.
    ///
    /// When `retrying`, the failure banner parameters follow the key.
    pub fn presentation_url(
        &self,
        key: &SessionKey,
        retrying: bool,
    ) -> Result<Url, Report<AuthenticatorError>> {
        let mut url = Url::parse(&self.public_base_url)
            .and_then(|base| base.join(&self.presentation_page))
            .map_err(|e| AuthenticatorError::UrlBuildFailed {
                details: e.to_string(),
            })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(SESSION_DATA_KEY, key.as_str());
            if retrying {
                query
                    .append_pair(AUTH_FAILURE, "true")
                    .append_pair(AUTH_FAILURE_MSG, LOGIN_FAIL_MESSAGE);
            }
        }

        Ok(url)
    }
}
