//! Inbound request parameters.

use std::collections::HashMap;

/// Correlation key parameter, shared by both handshake phases.
pub const SESSION_DATA_KEY: &str = "sessionDataKey";
/// Marker present on the return leg of an issued challenge.
pub const PROCEED_AUTH: &str = "proceedAuthorization";
/// Claimed username on the return leg.
pub const USERNAME: &str = "username";
/// Password parameter, only consulted by the legacy credential mode.
pub const PASSWORD: &str = "password";
/// Failure banner flag appended to retry redirects.
pub const AUTH_FAILURE: &str = "authFailure";
/// Failure banner message key appended to retry redirects.
pub const AUTH_FAILURE_MSG: &str = "authFailureMsg";
/// Message key the presentation page resolves for the failure banner.
pub const LOGIN_FAIL_MESSAGE: &str = "login.fail.message";

/// Query/form parameters of one inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationRequest {
    params: HashMap<String, String>,
}

impl AuthenticationRequest {
    /// Creates a request with no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets a parameter, replacing any previous value.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns true if the parameter is present, whatever its value.
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }
}

impl From<HashMap<String, String>> for AuthenticationRequest {
    fn from(params: HashMap<String, String>) -> Self {
        Self { params }
    }
}
