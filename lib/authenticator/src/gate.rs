//! Tenant-aware role authorization.
//!
//! The gate fails closed: directory errors become denials and are logged,
//! never propagated. Only the delegated protocol reaches the directory at
//! all; every other request type is denied outright.

use crate::subject::Subject;
use qr_authenticator_core::{TenantDomain, TenantId};
use qr_authenticator_directory::{Directory, DirectoryError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Why the gate denied a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The request type is not the delegated protocol.
    UnsupportedProtocol { protocol: String },
    /// The subject's tenant does not exist.
    TenantNotFound { tenant: TenantDomain },
    /// The tenant has no reachable user store.
    UserStoreUnavailable { tenant: TenantDomain },
    /// A directory call failed.
    LookupFailed { details: String },
    /// The subject does not hold the required role.
    RoleNotGranted { role: String },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProtocol { protocol } => {
                write!(f, "request type '{protocol}' is not authorized by this gate")
            }
            Self::TenantNotFound { tenant } => write!(f, "tenant '{tenant}' not found"),
            Self::UserStoreUnavailable { tenant } => {
                write!(f, "user store of tenant '{tenant}' unavailable")
            }
            Self::LookupFailed { details } => write!(f, "directory lookup failed: {details}"),
            Self::RoleNotGranted { role } => write!(f, "role '{role}' not granted"),
        }
    }
}

/// Outcome of one authorization check. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    role: String,
    tenant: TenantDomain,
    tenant_id: Option<TenantId>,
    denial: Option<DenialReason>,
}

impl AuthorizationDecision {
    /// Returns true if the subject may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.denial.is_none()
    }

    /// Returns the role that was checked.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the tenant the subject was resolved (or attempted) against.
    #[must_use]
    pub fn tenant(&self) -> &TenantDomain {
        &self.tenant
    }

    /// Returns the resolved tenant identifier.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    /// Returns why the subject was denied.
    #[must_use]
    pub fn denial(&self) -> Option<&DenialReason> {
        self.denial.as_ref()
    }
}

/// Decides whether a subject may complete the handshake.
#[derive(Clone)]
pub struct AuthorizationGate {
    directory: Arc<dyn Directory>,
    role: String,
    delegated_protocol: String,
    default_tenant: TenantDomain,
}

impl AuthorizationGate {
    /// Creates a gate checking `role` for requests of `delegated_protocol`.
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        role: impl Into<String>,
        delegated_protocol: impl Into<String>,
        default_tenant: TenantDomain,
    ) -> Self {
        Self {
            directory,
            role: role.into(),
            delegated_protocol: delegated_protocol.into(),
            default_tenant,
        }
    }

    /// Returns the required role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Checks `subject` for a request of type `protocol`.
    #[instrument(skip(self, subject), fields(subject = %subject, role = %self.role))]
    pub async fn authorize(&self, subject: &Subject, protocol: &str) -> AuthorizationDecision {
        let tenant = subject.tenant_or(&self.default_tenant);
        let mut decision = AuthorizationDecision {
            role: self.role.clone(),
            tenant: tenant.clone(),
            tenant_id: None,
            denial: None,
        };

        if !protocol.eq_ignore_ascii_case(&self.delegated_protocol) {
            warn!(protocol, "request type not delegated, denying");
            decision.denial = Some(DenialReason::UnsupportedProtocol {
                protocol: protocol.to_string(),
            });
            return decision;
        }

        let tenant_id = match self.directory.resolve_tenant(&tenant).await {
            Ok(id) => id,
            Err(e) => {
                error!(tenant = %tenant, error = %e, "tenant resolution failed");
                decision.denial = Some(match e.current_context() {
                    DirectoryError::TenantNotFound { .. } => DenialReason::TenantNotFound {
                        tenant: tenant.clone(),
                    },
                    other => DenialReason::LookupFailed {
                        details: other.to_string(),
                    },
                });
                return decision;
            }
        };
        decision.tenant_id = Some(tenant_id);

        let store = match self.directory.user_store(tenant_id).await {
            Ok(store) => store,
            Err(e) => {
                error!(%tenant_id, error = %e, "user store lookup failed");
                decision.denial = Some(match e.current_context() {
                    DirectoryError::UserStoreUnavailable { .. } => {
                        DenialReason::UserStoreUnavailable { tenant }
                    }
                    other => DenialReason::LookupFailed {
                        details: other.to_string(),
                    },
                });
                return decision;
            }
        };

        match store.is_user_in_role(subject.local_name(), &self.role).await {
            Ok(true) => {
                debug!(%tenant_id, "role granted");
            }
            Ok(false) => {
                warn!(%tenant_id, "role not granted");
                decision.denial = Some(DenialReason::RoleNotGranted {
                    role: self.role.clone(),
                });
            }
            Err(e) => {
                error!(%tenant_id, error = %e, "role lookup failed");
                decision.denial = Some(DenialReason::LookupFailed {
                    details: e.current_context().to_string(),
                });
            }
        }

        decision
    }
}
