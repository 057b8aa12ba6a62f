//! Directory traits consumed by the authorization gate.

use crate::error::DirectoryError;
use async_trait::async_trait;
use qr_authenticator_core::{TenantDomain, TenantId};
use rootcause::prelude::Report;
use std::sync::Arc;

/// Multi-tenant directory.
///
/// Resolves tenant domains and hands out tenant-scoped user stores.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolves a tenant domain to its identifier.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown domains, or `LookupFailed` if
    /// the backend cannot answer.
    async fn resolve_tenant(&self, domain: &TenantDomain)
    -> Result<TenantId, Report<DirectoryError>>;

    /// Returns the user store of a tenant.
    ///
    /// # Errors
    ///
    /// Returns `UserStoreUnavailable` if the store cannot be reached.
    async fn user_store(
        &self,
        tenant_id: TenantId,
    ) -> Result<Arc<dyn UserStore>, Report<DirectoryError>>;
}

/// Tenant-scoped user store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Checks whether `username` (without tenant qualifier) holds `role`.
    ///
    /// # Errors
    ///
    /// Returns `LookupFailed` if the store cannot answer.
    async fn is_user_in_role(
        &self,
        username: &str,
        role: &str,
    ) -> Result<bool, Report<DirectoryError>>;
}
