//! Reference login pipeline for the QR-code authenticator.
//!
//! This crate provides a minimal axum host: it creates login attempts,
//! drives registered authenticators through them, and serves the rendered
//! challenge to the presentation page.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::ServerConfig;
use qr_authenticator::{AuthenticatorRegistry, QrAuthenticator, RegistryError};
use qr_authenticator_directory::StaticDirectory;
use rootcause::prelude::Report;
use state::AppState;
use std::sync::Arc;

/// Builds the application state described by `config`.
///
/// # Errors
///
/// Returns an error if an authenticator cannot be registered.
pub fn build_state(config: &ServerConfig) -> Result<AppState, Report<RegistryError>> {
    let directory = Arc::new(StaticDirectory::from_config(&config.directory));
    tracing::info!(tenants = directory.tenant_count(), "directory loaded");

    let mut registry = AuthenticatorRegistry::new();
    registry.register(Arc::new(QrAuthenticator::new(
        &config.authenticator,
        directory,
    )))?;

    let ttl = i64::try_from(config.attempt_ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX);
    Ok(AppState::new(registry, QrAuthenticator::NAME, ttl))
}
