//! Directory error types.

use qr_authenticator_core::{TenantDomain, TenantId};
use std::fmt;

/// Directory lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No tenant is registered under the domain.
    TenantNotFound {
        /// The domain that was looked up.
        domain: TenantDomain,
    },
    /// The tenant exists but its user store cannot be reached.
    UserStoreUnavailable {
        /// The tenant whose store was requested.
        tenant_id: TenantId,
    },
    /// The directory backend failed to answer.
    LookupFailed {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantNotFound { domain } => {
                write!(f, "tenant '{domain}' not found")
            }
            Self::UserStoreUnavailable { tenant_id } => {
                write!(f, "user store for tenant {tenant_id} is unavailable")
            }
            Self::LookupFailed { details } => {
                write!(f, "directory lookup failed: {details}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}
