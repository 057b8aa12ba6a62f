//! Per-attempt authentication context.
//!
//! The host pipeline owns the context and persists it between the two
//! handshake phases. The authenticator reads and mutates it only for the
//! duration of a single call.

use crate::subject::Subject;
use chrono::{DateTime, Duration, Utc};
use qr_authenticator_core::SessionKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an attempt in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeState {
    /// Nothing issued yet.
    Idle,
    /// Challenge issued, waiting for the return leg.
    AwaitingChallengeResponse,
    /// Subject authorized. Terminal.
    Succeeded,
    /// Last response failed; a new challenge is being issued.
    Retry,
    /// Attempt aborted. Terminal.
    Failed,
}

impl HandshakeState {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns the state name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingChallengeResponse => "awaiting_challenge_response",
            Self::Succeeded => "succeeded",
            Self::Retry => "retry",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject bound to an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "subject", rename_all = "snake_case")]
pub enum SubjectBinding {
    /// Claimed, authorization not yet granted.
    Provisional(Subject),
    /// Authorized.
    Authenticated(Subject),
}

impl SubjectBinding {
    /// Returns the bound subject regardless of status.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        match self {
            Self::Provisional(subject) | Self::Authenticated(subject) => subject,
        }
    }
}

/// State of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    /// Host-issued correlation key.
    session_key: SessionKey,
    /// Protocol that initiated the login (e.g. `oidc`, `samlsso`).
    request_type: String,
    /// Whether the current challenge follows a failed response.
    retrying: bool,
    /// Number of failed responses so far.
    retry_count: u32,
    /// Handshake position.
    state: HandshakeState,
    /// Authenticator currently driving the attempt.
    current_authenticator: Option<String>,
    /// Bound subject.
    subject: Option<SubjectBinding>,
    /// Message of the last failed response.
    last_failure: Option<String>,
    /// When the host created the attempt.
    created_at: DateTime<Utc>,
}

impl AuthenticationContext {
    /// Creates a fresh attempt.
    #[must_use]
    pub fn new(session_key: SessionKey, request_type: impl Into<String>) -> Self {
        Self {
            session_key,
            request_type: request_type.into(),
            retrying: false,
            retry_count: 0,
            state: HandshakeState::Idle,
            current_authenticator: None,
            subject: None,
            last_failure: None,
            created_at: Utc::now(),
        }
    }

    /// Returns the host-issued correlation key.
    #[must_use]
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// Returns the request-type tag.
    #[must_use]
    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    /// Returns true if the current challenge follows a failure.
    #[must_use]
    pub fn is_retrying(&self) -> bool {
        self.retrying
    }

    /// Sets the retry flag.
    pub fn set_retrying(&mut self, retrying: bool) {
        self.retrying = retrying;
    }

    /// Returns how many responses have failed.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the handshake state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Moves the handshake to `state`.
    pub fn set_state(&mut self, state: HandshakeState) {
        self.state = state;
    }

    /// Records a failed response and enters `Retry`.
    pub fn record_retry(&mut self, failure: impl Into<String>) {
        self.retrying = true;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_failure = Some(failure.into());
        self.state = HandshakeState::Retry;
    }

    /// Returns the message of the last failed response.
    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Returns the authenticator driving the attempt.
    #[must_use]
    pub fn current_authenticator(&self) -> Option<&str> {
        self.current_authenticator.as_deref()
    }

    /// Records the authenticator driving the attempt.
    pub fn set_current_authenticator(&mut self, name: impl Into<String>) {
        self.current_authenticator = Some(name.into());
    }

    /// Returns the subject binding, provisional or not.
    #[must_use]
    pub fn subject_binding(&self) -> Option<&SubjectBinding> {
        self.subject.as_ref()
    }

    /// Binds a claimed subject, replacing any previous binding.
    pub fn bind_provisional_subject(&mut self, subject: Subject) {
        self.subject = Some(SubjectBinding::Provisional(subject));
    }

    /// Promotes a provisional subject to authenticated.
    ///
    /// Returns false if no subject is bound.
    pub fn promote_subject(&mut self) -> bool {
        match self.subject.take() {
            Some(binding) => {
                let subject = match binding {
                    SubjectBinding::Provisional(s) | SubjectBinding::Authenticated(s) => s,
                };
                self.subject = Some(SubjectBinding::Authenticated(subject));
                true
            }
            None => false,
        }
    }

    /// Returns the subject only once authorization has been granted.
    #[must_use]
    pub fn authenticated_subject(&self) -> Option<&Subject> {
        match &self.subject {
            Some(SubjectBinding::Authenticated(subject)) => Some(subject),
            _ => None,
        }
    }

    /// Returns when the attempt was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true if the attempt is older than `ttl`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now().signed_duration_since(self.created_at) >= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AuthenticationContext {
        AuthenticationContext::new(SessionKey::from("key-1"), "oidc")
    }

    #[test]
    fn new_context_is_idle() {
        let ctx = context();
        assert_eq!(ctx.session_key().as_str(), "key-1");
        assert_eq!(ctx.request_type(), "oidc");
        assert_eq!(ctx.state(), HandshakeState::Idle);
        assert!(!ctx.is_retrying());
        assert_eq!(ctx.retry_count(), 0);
        assert!(ctx.subject_binding().is_none());
    }

    #[test]
    fn provisional_subject_is_not_authenticated() {
        let mut ctx = context();
        ctx.bind_provisional_subject(Subject::parse("bob@acme"));

        assert!(ctx.authenticated_subject().is_none());
        assert_eq!(
            ctx.subject_binding().map(|b| b.subject().username()),
            Some("bob@acme")
        );
    }

    #[test]
    fn promotion_authenticates_the_bound_subject() {
        let mut ctx = context();
        ctx.bind_provisional_subject(Subject::parse("bob@acme"));

        assert!(ctx.promote_subject());
        assert_eq!(
            ctx.authenticated_subject().map(Subject::username),
            Some("bob@acme")
        );
    }

    #[test]
    fn promotion_without_subject_fails() {
        let mut ctx = context();
        assert!(!ctx.promote_subject());
        assert!(ctx.authenticated_subject().is_none());
    }

    #[test]
    fn rebinding_demotes_to_provisional() {
        let mut ctx = context();
        ctx.bind_provisional_subject(Subject::parse("bob@acme"));
        ctx.promote_subject();
        ctx.bind_provisional_subject(Subject::parse("eve@acme"));

        assert!(ctx.authenticated_subject().is_none());
    }

    #[test]
    fn record_retry_sets_flag_and_counts() {
        let mut ctx = context();
        ctx.record_retry("denied");
        ctx.record_retry("denied again");

        assert!(ctx.is_retrying());
        assert_eq!(ctx.retry_count(), 2);
        assert_eq!(ctx.state(), HandshakeState::Retry);
        assert_eq!(ctx.last_failure(), Some("denied again"));
    }

    #[test]
    fn terminal_states() {
        assert!(HandshakeState::Succeeded.is_terminal());
        assert!(HandshakeState::Failed.is_terminal());
        assert!(!HandshakeState::Retry.is_terminal());
        assert!(!HandshakeState::AwaitingChallengeResponse.is_terminal());
    }

    #[test]
    fn expiry() {
        let ctx = context();
        assert!(!ctx.is_expired(Duration::minutes(10)));
        assert!(ctx.is_expired(Duration::seconds(-1)));
    }

    #[test]
    fn context_serialization_roundtrip() {
        let mut ctx = context();
        ctx.bind_provisional_subject(Subject::parse("bob@acme"));
        ctx.set_state(HandshakeState::AwaitingChallengeResponse);

        let json = serde_json::to_string(&ctx).expect("serialize");
        assert!(json.contains("\"awaiting_challenge_response\""));
        assert!(json.contains("\"provisional\""));

        let parsed: AuthenticationContext = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, ctx);
    }
}
