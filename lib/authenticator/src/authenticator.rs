//! The QR-code authenticator.
//!
//! Phase one renders the session key as a QR code and redirects the user
//! agent to the presentation page. Phase two accepts the subject claimed by
//! the scanning device and lets it through only if it holds the configured
//! role in its tenant.

use crate::codec::{ChallengeCodec, QrCodec};
use crate::config::{AuthenticatorConfig, HandlingMode};
use crate::context::{AuthenticationContext, HandshakeState};
use crate::correlator::SessionCorrelator;
use crate::error::AuthenticatorError;
use crate::gate::AuthorizationGate;
use crate::pipeline::ApplicationAuthenticator;
use crate::request::{AuthenticationRequest, PASSWORD, PROCEED_AUTH, USERNAME};
use crate::response::AuthenticatorResponse;
use crate::subject::Subject;
use async_trait::async_trait;
use qr_authenticator_core::SessionKey;
use qr_authenticator_directory::Directory;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// QR-code second-factor authenticator.
pub struct QrAuthenticator {
    mode: HandlingMode,
    correlator: SessionCorrelator,
    codec: Arc<dyn ChallengeCodec>,
    gate: AuthorizationGate,
}

impl QrAuthenticator {
    /// Registration name.
    pub const NAME: &'static str = "qrcode";
    /// Display name.
    pub const FRIENDLY_NAME: &'static str = "QRCodeBased";

    /// Creates an authenticator checking roles against `directory`.
    #[must_use]
    pub fn new(config: &AuthenticatorConfig, directory: Arc<dyn Directory>) -> Self {
        Self {
            mode: config.mode(),
            correlator: SessionCorrelator::new(
                config.public_base_url(),
                config.presentation_page(),
            ),
            codec: Arc::new(QrCodec::new(*config.qr())),
            gate: AuthorizationGate::new(
                directory,
                config.role_name(),
                config.delegated_protocol(),
                config.default_tenant(),
            ),
        }
    }

    /// Replaces the challenge codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn ChallengeCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the handling mode.
    #[must_use]
    pub fn mode(&self) -> HandlingMode {
        self.mode
    }

    fn accepts_response_in(&self, state: HandshakeState) -> bool {
        match state {
            HandshakeState::AwaitingChallengeResponse => true,
            // Credential mode has no challenge leg of its own.
            HandshakeState::Idle => self.mode == HandlingMode::Credential,
            _ => false,
        }
    }
}

#[async_trait]
impl ApplicationAuthenticator for QrAuthenticator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn friendly_name(&self) -> &str {
        Self::FRIENDLY_NAME
    }

    fn can_handle(&self, request: &AuthenticationRequest) -> bool {
        match self.mode {
            HandlingMode::Challenge => request.has_param(PROCEED_AUTH),
            HandlingMode::Credential => request.has_param(USERNAME) && request.has_param(PASSWORD),
        }
    }

    #[instrument(skip_all, fields(session_key = %context.session_key(), retrying = context.is_retrying()))]
    fn initiate(
        &self,
        request: &AuthenticationRequest,
        context: &mut AuthenticationContext,
        response: &mut dyn AuthenticatorResponse,
    ) -> Result<(), Report<AuthenticatorError>> {
        if context.state().is_terminal() {
            return Err(AuthenticatorError::UnexpectedState {
                state: context.state(),
            }
            .into());
        }

        let key = self.correlator.correlate(request, context)?;
        let location = self
            .correlator
            .presentation_url(&key, context.is_retrying())?;

        let challenge =
            self.codec
                .render(key.as_str())
                .map_err(|e| AuthenticatorError::ChallengeRenderFailed {
                    details: e.current_context().to_string(),
                })?;
        debug!(media_type = challenge.media_type(), "challenge rendered");

        response
            .publish_challenge(&key, challenge)
            .map_err(|e| AuthenticatorError::RedirectFailed {
                details: e.current_context().to_string(),
            })?;
        response
            .send_redirect(&location)
            .map_err(|e| AuthenticatorError::RedirectFailed {
                details: e.current_context().to_string(),
            })?;

        context.set_state(HandshakeState::AwaitingChallengeResponse);
        info!(location = %location, "challenge issued");
        Ok(())
    }

    #[instrument(skip_all, fields(session_key = %context.session_key(), request_type = context.request_type()))]
    async fn process_response(
        &self,
        request: &AuthenticationRequest,
        context: &mut AuthenticationContext,
    ) -> Result<(), Report<AuthenticatorError>> {
        if !self.accepts_response_in(context.state()) {
            return Err(AuthenticatorError::UnexpectedState {
                state: context.state(),
            }
            .into());
        }
        self.correlator.correlate(request, context)?;

        let username = request
            .param(USERNAME)
            .filter(|u| !u.is_empty())
            .ok_or(AuthenticatorError::MissingParameter { name: USERNAME })?;
        let subject = Subject::parse(username);
        context.bind_provisional_subject(subject.clone());

        let decision = self.gate.authorize(&subject, context.request_type()).await;
        if let Some(reason) = decision.denial() {
            warn!(subject = %subject, reason = %reason, "subject denied");
            return Err(AuthenticatorError::InvalidCredentials {
                subject: subject.username().to_string(),
                reason: reason.clone(),
            }
            .into());
        }

        context.promote_subject();
        info!(subject = %subject, tenant = %decision.tenant(), "subject authorized");
        Ok(())
    }

    fn retry_authentication_enabled(&self) -> bool {
        true
    }

    fn context_identifier(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<SessionKey, Report<AuthenticatorError>> {
        self.correlator.session_key(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Challenge;
    use crate::error::{CodecError, FailureKind, ResponseError};
    use crate::gate::DenialReason;
    use crate::gate::tests::{FailingDirectory, StorelessDirectory, granting_directory};
    use crate::pipeline::FlowStatus;
    use crate::request::SESSION_DATA_KEY;
    use crate::response::BufferedResponse;
    use url::Url;

    const KEY: &str = "01J9Z8K6Q2WX3V4B5N6M7P8R9S";

    fn config() -> AuthenticatorConfig {
        AuthenticatorConfig::builder()
            .public_base_url("https://idp.example.com")
            .build()
    }

    fn authenticator() -> QrAuthenticator {
        QrAuthenticator::new(&config(), granting_directory())
    }

    fn context(request_type: &str) -> AuthenticationContext {
        AuthenticationContext::new(SessionKey::from(KEY), request_type)
    }

    fn awaiting(request_type: &str) -> AuthenticationContext {
        let mut ctx = context(request_type);
        ctx.set_state(HandshakeState::AwaitingChallengeResponse);
        ctx
    }

    fn login_request() -> AuthenticationRequest {
        AuthenticationRequest::new().with_param(SESSION_DATA_KEY, KEY)
    }

    fn answer(username: &str) -> AuthenticationRequest {
        login_request()
            .with_param(PROCEED_AUTH, "")
            .with_param(USERNAME, username)
    }

    struct BrokenCodec;

    impl ChallengeCodec for BrokenCodec {
        fn render(&self, _text: &str) -> Result<Challenge, Report<CodecError>> {
            Err(CodecError::EncodingFailed {
                details: "data too long".to_string(),
            }
            .into())
        }
    }

    struct BrokenTransport;

    impl AuthenticatorResponse for BrokenTransport {
        fn publish_challenge(
            &mut self,
            _key: &SessionKey,
            _challenge: Challenge,
        ) -> Result<(), Report<ResponseError>> {
            Ok(())
        }

        fn send_redirect(&mut self, _location: &Url) -> Result<(), Report<ResponseError>> {
            Err(ResponseError::WriteFailed {
                details: "broken pipe".to_string(),
            }
            .into())
        }
    }

    #[test]
    fn names_and_retry() {
        let auth = authenticator();
        assert_eq!(auth.name(), "qrcode");
        assert_eq!(auth.friendly_name(), "QRCodeBased");
        assert!(auth.retry_authentication_enabled());
    }

    #[test]
    fn challenge_mode_handles_only_marked_requests() {
        let auth = authenticator();
        assert!(auth.can_handle(&AuthenticationRequest::new().with_param(PROCEED_AUTH, "")));
        assert!(auth.can_handle(
            &AuthenticationRequest::new()
                .with_param(PROCEED_AUTH, "true")
                .with_param(USERNAME, "bob")
                .with_param(PASSWORD, "secret")
                .with_param(SESSION_DATA_KEY, KEY)
        ));
        assert!(!auth.can_handle(&login_request()));
        assert!(!auth.can_handle(
            &AuthenticationRequest::new()
                .with_param(USERNAME, "bob")
                .with_param(PASSWORD, "secret")
        ));
    }

    #[test]
    fn credential_mode_handles_username_and_password() {
        let config = AuthenticatorConfig::builder()
            .mode(HandlingMode::Credential)
            .build();
        let auth = QrAuthenticator::new(&config, granting_directory());

        assert!(auth.can_handle(
            &AuthenticationRequest::new()
                .with_param(USERNAME, "bob")
                .with_param(PASSWORD, "")
        ));
        assert!(!auth.can_handle(&AuthenticationRequest::new().with_param(USERNAME, "bob")));
        assert!(!auth.can_handle(&AuthenticationRequest::new().with_param(PROCEED_AUTH, "")));
    }

    #[test]
    fn initiate_redirects_with_session_key() {
        let auth = authenticator();
        let mut ctx = context("oidc");
        let mut response = BufferedResponse::new();

        auth.initiate(&login_request(), &mut ctx, &mut response)
            .expect("initiate");

        assert_eq!(ctx.state(), HandshakeState::AwaitingChallengeResponse);
        let location = response.redirect().expect("redirect").clone();
        assert_eq!(
            location.as_str(),
            format!("https://idp.example.com/authenticationendpoint/qrpage.jsp?sessionDataKey={KEY}")
        );
        assert!(response.challenge().is_some());

        // The page posts the key back unchanged.
        let embedded: String = location
            .query_pairs()
            .find(|(name, _)| name == SESSION_DATA_KEY)
            .map(|(_, value)| value.into_owned())
            .expect("embedded key");
        let returned = AuthenticationRequest::new().with_param(SESSION_DATA_KEY, embedded);
        assert_eq!(
            auth.context_identifier(&returned).expect("identifier"),
            SessionKey::from(KEY)
        );
    }

    #[test]
    fn retrying_initiate_adds_failure_banner() {
        let auth = authenticator();
        let mut ctx = context("oidc");
        ctx.set_retrying(true);
        let mut response = BufferedResponse::new();

        auth.initiate(&login_request(), &mut ctx, &mut response)
            .expect("initiate");

        let query = response.redirect().and_then(Url::query).expect("query");
        assert!(query.ends_with("&authFailure=true&authFailureMsg=login.fail.message"));
    }

    #[test]
    fn initiate_rejects_foreign_session_key() {
        let auth = authenticator();
        let mut ctx = context("oidc");
        let request = AuthenticationRequest::new().with_param(SESSION_DATA_KEY, "other");
        let mut response = BufferedResponse::new();

        let err = auth.initiate(&request, &mut ctx, &mut response).unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticatorError::InvalidSessionKey { .. }
        ));
        assert!(response.redirect().is_none());
    }

    #[test]
    fn render_failure_aborts_initiate() {
        let auth = authenticator().with_codec(Arc::new(BrokenCodec));
        let mut ctx = context("oidc");
        let mut response = BufferedResponse::new();

        let err = auth
            .initiate(&login_request(), &mut ctx, &mut response)
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            AuthenticatorError::ChallengeRenderFailed { .. }
        ));
        assert_eq!(err.current_context().kind(), FailureKind::AuthenticationFailed);
        assert!(response.redirect().is_none());
        assert_eq!(ctx.state(), HandshakeState::Idle);
    }

    #[test]
    fn redirect_failure_is_reported() {
        let auth = authenticator();
        let mut ctx = context("oidc");

        let err = auth
            .initiate(&login_request(), &mut ctx, &mut BrokenTransport)
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            AuthenticatorError::RedirectFailed { .. }
        ));
    }

    #[test]
    fn misconfigured_page_location_fails_url_build() {
        let config = AuthenticatorConfig::builder()
            .public_base_url("not a url")
            .build();
        let auth = QrAuthenticator::new(&config, granting_directory());
        let mut ctx = context("oidc");

        let err = auth
            .initiate(&login_request(), &mut ctx, &mut BufferedResponse::new())
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            AuthenticatorError::UrlBuildFailed { .. }
        ));
    }

    #[tokio::test]
    async fn role_holder_is_authenticated() {
        let auth = authenticator();
        let mut ctx = awaiting("oidc");

        auth.process_response(&answer("bob@acme"), &mut ctx)
            .await
            .expect("authorized");

        let subject = ctx.authenticated_subject().expect("authenticated");
        assert_eq!(subject.username(), "bob@acme");
    }

    #[tokio::test]
    async fn missing_role_is_invalid_credentials() {
        let auth = authenticator();
        let mut ctx = awaiting("oidc");

        let err = auth
            .process_response(&answer("carol@acme"), &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &AuthenticatorError::InvalidCredentials {
                subject: "carol@acme".to_string(),
                reason: DenialReason::RoleNotGranted {
                    role: "photoSharingRole".to_string()
                },
            }
        );
        assert!(ctx.authenticated_subject().is_none());
        assert_eq!(
            ctx.subject_binding().map(|b| b.subject().username()),
            Some("carol@acme")
        );
    }

    #[tokio::test]
    async fn non_delegated_protocol_always_fails() {
        let auth = authenticator();
        let mut ctx = awaiting("saml");

        let err = auth
            .process_response(&answer("bob@acme"), &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(err.current_context().kind(), FailureKind::InvalidCredentials);
        assert_eq!(err.current_context().rejected_subject(), Some("bob@acme"));
    }

    #[tokio::test]
    async fn directory_failure_denies_without_propagating() {
        let auth = QrAuthenticator::new(&config(), Arc::new(FailingDirectory));
        let mut ctx = awaiting("oidc");

        let err = auth
            .process_response(&answer("bob@acme"), &mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            AuthenticatorError::InvalidCredentials {
                reason: DenialReason::LookupFailed { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unavailable_user_store_is_invalid_credentials() {
        let auth = QrAuthenticator::new(&config(), Arc::new(StorelessDirectory));
        let mut ctx = awaiting("oidc");

        let err = auth
            .process_response(&answer("bob@acme"), &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &AuthenticatorError::InvalidCredentials {
                subject: "bob@acme".to_string(),
                reason: DenialReason::UserStoreUnavailable {
                    tenant: "acme".into()
                },
            }
        );
        assert_eq!(err.current_context().kind(), FailureKind::InvalidCredentials);
        assert!(ctx.authenticated_subject().is_none());
    }

    #[tokio::test]
    async fn default_tenant_user_is_authenticated() {
        let auth = authenticator();
        let mut ctx = awaiting("oidc");

        auth.process_response(&answer("alice"), &mut ctx)
            .await
            .expect("authorized");
    }

    #[tokio::test]
    async fn missing_username_is_rejected() {
        let auth = authenticator();
        let mut ctx = awaiting("oidc");

        for request in [
            login_request().with_param(PROCEED_AUTH, ""),
            answer(""),
        ] {
            let err = auth.process_response(&request, &mut ctx).await.unwrap_err();
            assert_eq!(
                err.current_context(),
                &AuthenticatorError::MissingParameter { name: USERNAME }
            );
        }
    }

    #[tokio::test]
    async fn response_before_challenge_is_rejected() {
        let auth = authenticator();
        let mut ctx = context("oidc");

        let err = auth
            .process_response(&answer("bob@acme"), &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &AuthenticatorError::UnexpectedState {
                state: HandshakeState::Idle
            }
        );
    }

    #[tokio::test]
    async fn credential_mode_accepts_response_without_challenge() {
        let config = AuthenticatorConfig::builder()
            .mode(HandlingMode::Credential)
            .build();
        let auth = QrAuthenticator::new(&config, granting_directory());
        let mut ctx = context("oidc");
        let request = login_request()
            .with_param(USERNAME, "bob@acme")
            .with_param(PASSWORD, "not-checked");

        let status = auth
            .process(&request, &mut ctx, &mut BufferedResponse::new())
            .await
            .expect("process");

        assert_eq!(status, FlowStatus::SuccessCompleted);
    }

    #[tokio::test]
    async fn full_handshake_with_retry() {
        let auth = authenticator();
        let mut ctx = context("oidc");

        let mut response = BufferedResponse::new();
        let status = auth
            .process(&login_request(), &mut ctx, &mut response)
            .await
            .expect("initiate");
        assert_eq!(status, FlowStatus::Incomplete);
        assert!(!response.redirect().expect("redirect").as_str().contains("authFailure"));

        let mut response = BufferedResponse::new();
        let status = auth
            .process(&answer("carol@acme"), &mut ctx, &mut response)
            .await
            .expect("retry");
        assert_eq!(status, FlowStatus::Incomplete);
        assert!(ctx.is_retrying());
        assert_eq!(ctx.retry_count(), 1);
        assert_eq!(ctx.state(), HandshakeState::AwaitingChallengeResponse);
        assert!(response.redirect().expect("redirect").as_str().contains("authFailure=true"));

        let status = auth
            .process(&answer("bob@acme"), &mut ctx, &mut BufferedResponse::new())
            .await
            .expect("complete");
        assert_eq!(status, FlowStatus::SuccessCompleted);
        assert_eq!(ctx.state(), HandshakeState::Succeeded);
        assert!(!ctx.is_retrying());
        assert_eq!(
            ctx.authenticated_subject().map(Subject::username),
            Some("bob@acme")
        );
    }

    #[tokio::test]
    async fn failed_reissue_fails_the_attempt() {
        let auth = authenticator().with_codec(Arc::new(BrokenCodec));
        let mut ctx = awaiting("saml");

        let err = auth
            .process(&answer("bob@acme"), &mut ctx, &mut BufferedResponse::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            AuthenticatorError::ChallengeRenderFailed { .. }
        ));
        assert_eq!(ctx.state(), HandshakeState::Failed);
    }
}
