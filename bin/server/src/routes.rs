//! Login pipeline routes.
//!
//! `/login` starts an attempt with the default authenticator, `/commonauth`
//! resumes it with whatever the presentation page or scanning device sends
//! back. Attempts live in the [`AttemptStore`](crate::state::AttemptStore)
//! between the two and are leased for the duration of each step.

use crate::error::ServerError;
use crate::state::{AppState, AttemptLease};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use qr_authenticator::request::SESSION_DATA_KEY;
use qr_authenticator::{
    ApplicationAuthenticator, AuthenticationContext, AuthenticationRequest,
    AuthenticatorDescriptor, BufferedResponse, FlowStatus,
};
use qr_authenticator_core::SessionKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Query parameters for `/login`.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Protocol the relying party used (`oidc`, `samlsso`, ...).
    #[serde(rename = "type")]
    request_type: String,
}

/// Body returned when an attempt completes.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletedLogin {
    pub subject: String,
    pub tenant: Option<String>,
    pub authenticator: String,
}

/// Challenge embedded as a `data:` URL, for pages that inline the image.
#[derive(Debug, Serialize, Deserialize)]
pub struct InlineChallenge {
    pub media_type: String,
    pub data_url: String,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/commonauth", get(commonauth))
        .route("/challenge/{session_data_key}", get(challenge))
        .route("/challenge/{session_data_key}/inline", get(inline_challenge))
        .route("/authenticators", get(authenticators))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts a new login attempt.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ServerError> {
    let authenticator = state.authenticator(&state.default_authenticator)?;

    let key = SessionKey::generate();
    let context = AuthenticationContext::new(key.clone(), query.request_type);
    let request = AuthenticationRequest::new().with_param(SESSION_DATA_KEY, key.as_str());

    info!(session_key = %key, request_type = context.request_type(), "login attempt started");
    let lease = state.attempts.begin(context);
    step(authenticator.as_ref(), &request, lease).await
}

/// Resumes a login attempt.
pub async fn commonauth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ServerError> {
    let request = AuthenticationRequest::from(params);

    let key = state
        .authenticator(&state.default_authenticator)?
        .context_identifier(&request)?;
    let lease = state.attempts.checkout(&key)?;

    let name = lease
        .context()
        .current_authenticator()
        .unwrap_or(state.default_authenticator.as_str())
        .to_string();
    let authenticator = state.authenticator(&name)?;

    step(authenticator.as_ref(), &request, lease).await
}

/// Runs one authenticator step on a leased attempt and turns its outcome
/// into a response.
///
/// Unfinished attempts are committed back with their new challenge; finished
/// or failed ones are removed.
async fn step(
    authenticator: &dyn ApplicationAuthenticator,
    request: &AuthenticationRequest,
    mut lease: AttemptLease<'_>,
) -> Result<Response, ServerError> {
    let mut response = BufferedResponse::new();
    let status = authenticator
        .process(request, lease.context_mut(), &mut response)
        .await;

    match status {
        Ok(FlowStatus::SuccessCompleted) => {
            let context = lease.finish();
            let subject = context
                .authenticated_subject()
                .ok_or(ServerError::MissingRedirect)?;
            info!(session_key = %context.session_key(), subject = %subject, "login completed");

            Ok(Json(CompletedLogin {
                subject: subject.username().to_string(),
                tenant: subject.tenant_domain().map(ToString::to_string),
                authenticator: authenticator.name().to_string(),
            })
            .into_response())
        }
        Ok(FlowStatus::Incomplete) => {
            let (challenge, redirect) = response.into_parts();
            let Some(location) = redirect else {
                lease.finish();
                return Err(ServerError::MissingRedirect);
            };

            lease.commit(challenge.map(|(_, c)| c));
            Ok(Redirect::to(location.as_str()).into_response())
        }
        Err(e) => {
            let context = lease.finish();
            warn!(session_key = %context.session_key(), error = %e, "login attempt failed");
            Err(e.into())
        }
    }
}

/// Serves the challenge of a live attempt.
pub async fn challenge(
    State(state): State<Arc<AppState>>,
    Path(session_data_key): Path<String>,
) -> Result<Response, ServerError> {
    let challenge = state.attempts.challenge(&SessionKey::from(session_data_key))?;

    Ok((
        [(header::CONTENT_TYPE, challenge.media_type().to_string())],
        challenge.bytes().to_vec(),
    )
        .into_response())
}

/// Serves the challenge of a live attempt as a `data:` URL.
pub async fn inline_challenge(
    State(state): State<Arc<AppState>>,
    Path(session_data_key): Path<String>,
) -> Result<Json<InlineChallenge>, ServerError> {
    let challenge = state.attempts.challenge(&SessionKey::from(session_data_key))?;

    Ok(Json(InlineChallenge {
        media_type: challenge.media_type().to_string(),
        data_url: challenge.to_data_url(),
    }))
}

/// Lists registered authenticators.
pub async fn authenticators(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<AuthenticatorDescriptor>> {
    Json(state.registry.descriptors())
}

/// Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
