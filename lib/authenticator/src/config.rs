//! Authenticator configuration.
//!
//! Every field has a default, so an empty configuration source produces a
//! working authenticator for the default tenant.

use qr_authenticator_core::TenantDomain;
use serde::{Deserialize, Serialize};

/// Which requests the authenticator claims as responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlingMode {
    /// Claims requests carrying the `proceedAuthorization` marker.
    #[default]
    Challenge,
    /// Claims requests carrying both `username` and `password`.
    ///
    /// The password is never checked; only eligibility changes.
    Credential,
}

/// Error-correction level of the rendered symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorCorrection {
    /// Recovers ~7% of codewords.
    #[default]
    L,
    /// Recovers ~15% of codewords.
    M,
    /// Recovers ~25% of codewords.
    Q,
    /// Recovers ~30% of codewords.
    H,
}

/// Challenge rendering settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrConfig {
    /// Default: `L`
    #[serde(default)]
    pub error_correction: ErrorCorrection,
    /// Minimum rendered width and height in pixels.
    /// Default: 125
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::default(),
            min_dimension: default_min_dimension(),
        }
    }
}

fn default_min_dimension() -> u32 {
    125
}

/// Configuration for [`QrAuthenticator`](crate::QrAuthenticator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorConfig {
    /// Default: `challenge`
    #[serde(default)]
    mode: HandlingMode,
    /// Scheme and authority the presentation page is served from.
    /// Default: "https://localhost:9443"
    #[serde(default = "default_public_base_url")]
    public_base_url: String,
    /// Path of the challenge presentation page.
    /// Default: "/authenticationendpoint/qrpage.jsp"
    #[serde(default = "default_presentation_page")]
    presentation_page: String,
    /// Role a subject must hold to pass the gate.
    /// Default: "photoSharingRole"
    #[serde(default = "default_role_name")]
    role_name: String,
    /// The only request type that triggers a real role check.
    /// Default: "oidc"
    #[serde(default = "default_delegated_protocol")]
    delegated_protocol: String,
    /// Tenant for usernames without an `@tenant` qualifier.
    /// Default: "carbon.super"
    #[serde(default = "default_tenant")]
    default_tenant: String,
    #[serde(default)]
    qr: QrConfig,
}

fn default_public_base_url() -> String {
    "https://localhost:9443".to_string()
}

fn default_presentation_page() -> String {
    "/authenticationendpoint/qrpage.jsp".to_string()
}

fn default_role_name() -> String {
    "photoSharingRole".to_string()
}

fn default_delegated_protocol() -> String {
    "oidc".to_string()
}

fn default_tenant() -> String {
    "carbon.super".to_string()
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            mode: HandlingMode::default(),
            public_base_url: default_public_base_url(),
            presentation_page: default_presentation_page(),
            role_name: default_role_name(),
            delegated_protocol: default_delegated_protocol(),
            default_tenant: default_tenant(),
            qr: QrConfig::default(),
        }
    }
}

impl AuthenticatorConfig {
    /// Creates a configuration builder starting from the defaults.
    #[must_use]
    pub fn builder() -> AuthenticatorConfigBuilder {
        AuthenticatorConfigBuilder::default()
    }

    /// Returns the handling mode.
    #[must_use]
    pub fn mode(&self) -> HandlingMode {
        self.mode
    }

    /// Returns the base URL of the presentation page.
    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Returns the presentation page path.
    #[must_use]
    pub fn presentation_page(&self) -> &str {
        &self.presentation_page
    }

    /// Returns the required role.
    #[must_use]
    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    /// Returns the distinguished request type.
    #[must_use]
    pub fn delegated_protocol(&self) -> &str {
        &self.delegated_protocol
    }

    /// Returns the default tenant.
    #[must_use]
    pub fn default_tenant(&self) -> TenantDomain {
        TenantDomain::new(self.default_tenant.clone())
    }

    /// Returns the rendering settings.
    #[must_use]
    pub fn qr(&self) -> &QrConfig {
        &self.qr
    }
}

/// Builder for `AuthenticatorConfig`.
#[derive(Debug, Default)]
pub struct AuthenticatorConfigBuilder {
    config: AuthenticatorConfig,
}

impl AuthenticatorConfigBuilder {
    /// Sets the handling mode.
    #[must_use]
    pub fn mode(mut self, mode: HandlingMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Sets the base URL of the presentation page.
    #[must_use]
    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_base_url = url.into();
        self
    }

    /// Sets the presentation page path.
    #[must_use]
    pub fn presentation_page(mut self, path: impl Into<String>) -> Self {
        self.config.presentation_page = path.into();
        self
    }

    /// Sets the required role.
    #[must_use]
    pub fn role_name(mut self, role: impl Into<String>) -> Self {
        self.config.role_name = role.into();
        self
    }

    /// Sets the distinguished request type.
    #[must_use]
    pub fn delegated_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.config.delegated_protocol = protocol.into();
        self
    }

    /// Sets the default tenant.
    #[must_use]
    pub fn default_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.config.default_tenant = tenant.into();
        self
    }

    /// Sets the rendering settings.
    #[must_use]
    pub fn qr(mut self, qr: QrConfig) -> Self {
        self.config.qr = qr;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> AuthenticatorConfig {
        self.config
    }
}
