//! Subject claimed on the return leg of the handshake.
//!
//! Usernames follow the multi-tenant `user@tenant` convention: the text
//! after the last `@` names the tenant. A username without a qualifier
//! belongs to the default tenant.

use qr_authenticator_core::TenantDomain;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity claimed by the user agent.
///
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The username exactly as submitted.
    username: String,
    /// The username without tenant qualifier.
    local_name: String,
    /// Tenant qualifier, if the username carried one.
    tenant_domain: Option<TenantDomain>,
}

impl Subject {
    /// Parses a submitted username.
    #[must_use]
    pub fn parse(username: &str) -> Self {
        let (local_name, tenant_domain) = match username.rsplit_once('@') {
            Some((local, tenant)) if !tenant.is_empty() => {
                (local.to_string(), Some(TenantDomain::new(tenant)))
            }
            _ => (username.to_string(), None),
        };

        Self {
            username: username.to_string(),
            local_name,
            tenant_domain,
        }
    }

    /// Returns the username as submitted.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the username without tenant qualifier.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns the tenant qualifier, if any.
    #[must_use]
    pub fn tenant_domain(&self) -> Option<&TenantDomain> {
        self.tenant_domain.as_ref()
    }

    /// Returns the tenant the subject belongs to, falling back to `default`.
    #[must_use]
    pub fn tenant_or(&self, default: &TenantDomain) -> TenantDomain {
        self.tenant_domain.clone().unwrap_or_else(|| default.clone())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
