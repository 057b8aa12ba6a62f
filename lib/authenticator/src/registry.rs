//! Authenticator registration.

use crate::error::RegistryError;
use crate::pipeline::ApplicationAuthenticator;
use crate::request::AuthenticationRequest;
use qr_authenticator_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Public description of a registered authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorDescriptor {
    pub name: String,
    pub friendly_name: String,
    pub retry_enabled: bool,
}

/// Authenticators available to the host pipeline, in registration order.
#[derive(Clone, Default)]
pub struct AuthenticatorRegistry {
    authenticators: Vec<Arc<dyn ApplicationAuthenticator>>,
}

impl AuthenticatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authenticator under its own name.
    pub fn register(
        &mut self,
        authenticator: Arc<dyn ApplicationAuthenticator>,
    ) -> Result<(), RegistryError> {
        let name = authenticator.name();
        if self.get(name).is_some() {
            return Err(RegistryError::DuplicateAuthenticator {
                name: name.to_string(),
            }
            .into());
        }

        info!(
            name,
            friendly_name = authenticator.friendly_name(),
            "authenticator registered"
        );
        self.authenticators.push(authenticator);
        Ok(())
    }

    /// Looks up an authenticator by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ApplicationAuthenticator>> {
        self.authenticators
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    /// Returns the first authenticator that claims `request` as a response.
    #[must_use]
    pub fn select(&self, request: &AuthenticationRequest) -> Option<Arc<dyn ApplicationAuthenticator>> {
        self.authenticators
            .iter()
            .find(|a| a.can_handle(request))
            .cloned()
    }

    /// Describes every registered authenticator.
    #[must_use]
    pub fn descriptors(&self) -> Vec<AuthenticatorDescriptor> {
        self.authenticators
            .iter()
            .map(|a| AuthenticatorDescriptor {
                name: a.name().to_string(),
                friendly_name: a.friendly_name().to_string(),
                retry_enabled: a.retry_authentication_enabled(),
            })
            .collect()
    }

    /// Returns the number of registered authenticators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::QrAuthenticator;
    use crate::config::AuthenticatorConfig;
    use crate::gate::tests::granting_directory;
    use crate::request::PROCEED_AUTH;

    fn qr() -> Arc<dyn ApplicationAuthenticator> {
        Arc::new(QrAuthenticator::new(
            &AuthenticatorConfig::default(),
            granting_directory(),
        ))
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = AuthenticatorRegistry::new();
        assert!(registry.is_empty());
        registry.register(qr()).expect("register");

        assert_eq!(registry.len(), 1);
        assert!(registry.get("qrcode").is_some());
        assert!(registry.get("totp").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = AuthenticatorRegistry::new();
        registry.register(qr()).expect("register");

        let err = registry.register(qr()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &RegistryError::DuplicateAuthenticator {
                name: "qrcode".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn select_by_request() {
        let mut registry = AuthenticatorRegistry::new();
        registry.register(qr()).expect("register");

        let marked = AuthenticationRequest::new().with_param(PROCEED_AUTH, "");
        assert_eq!(
            registry.select(&marked).map(|a| a.name().to_string()),
            Some("qrcode".to_string())
        );
        assert!(registry.select(&AuthenticationRequest::new()).is_none());
    }

    #[test]
    fn descriptors() {
        let mut registry = AuthenticatorRegistry::new();
        registry.register(qr()).expect("register");

        assert_eq!(
            registry.descriptors(),
            vec![AuthenticatorDescriptor {
                name: "qrcode".to_string(),
                friendly_name: "QRCodeBased".to_string(),
                retry_enabled: true,
            }]
        );
    }
}
