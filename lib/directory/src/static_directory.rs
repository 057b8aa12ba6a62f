//! Config-backed directory.
//!
//! Tenants, users, and role grants are declared up front and never change
//! at runtime. Intended for single-node deployments and tests.

use crate::directory::{Directory, UserStore};
use crate::error::DirectoryError;
use async_trait::async_trait;
use qr_authenticator_core::{TenantDomain, TenantId};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Static directory configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticDirectoryConfig {
    /// Declared tenants.
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// A tenant and its users.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    /// Tenant domain, as used after `@` in usernames.
    pub domain: String,
    /// Fixed tenant identifier. Generated when omitted.
    #[serde(default)]
    pub id: Option<TenantId>,
    /// Users of the tenant.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// A user and the roles granted to it.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Username without tenant qualifier.
    pub username: String,
    /// Granted role names.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl TenantConfig {
    /// Creates a tenant with no users.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            id: None,
            users: Vec::new(),
        }
    }

    /// Adds a user holding the given roles.
    #[must_use]
    pub fn with_user(mut self, username: impl Into<String>, roles: &[&str]) -> Self {
        self.users.push(UserConfig {
            username: username.into(),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        });
        self
    }
}

/// Directory built from [`StaticDirectoryConfig`].
#[derive(Clone, Default)]
pub struct StaticDirectory {
    tenants: HashMap<TenantDomain, TenantId>,
    stores: HashMap<TenantId, Arc<StaticUserStore>>,
}

impl StaticDirectory {
    /// Builds the directory from configuration.
    ///
    /// A domain declared twice keeps its last declaration.
    #[must_use]
    pub fn from_config(config: &StaticDirectoryConfig) -> Self {
        let mut tenants = HashMap::new();
        let mut stores = HashMap::new();

        for tenant in &config.tenants {
            let tenant_id = tenant.id.unwrap_or_default();
            let roles = tenant
                .users
                .iter()
                .map(|u| (u.username.clone(), u.roles.iter().cloned().collect()))
                .collect();

            tenants.insert(TenantDomain::new(tenant.domain.clone()), tenant_id);
            stores.insert(tenant_id, Arc::new(StaticUserStore { roles }));
        }

        Self { tenants, stores }
    }

    /// Returns the number of declared tenants.
    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn resolve_tenant(
        &self,
        domain: &TenantDomain,
    ) -> Result<TenantId, Report<DirectoryError>> {
        let tenant_id = self
            .tenants
            .get(domain)
            .copied()
            .ok_or_else(|| DirectoryError::TenantNotFound {
                domain: domain.clone(),
            })?;

        debug!(%tenant_id, "tenant resolved");
        Ok(tenant_id)
    }

    async fn user_store(
        &self,
        tenant_id: TenantId,
    ) -> Result<Arc<dyn UserStore>, Report<DirectoryError>> {
        match self.stores.get(&tenant_id) {
            Some(store) => Ok(store.clone()),
            None => Err(DirectoryError::UserStoreUnavailable { tenant_id }.into()),
        }
    }
}

/// User store of a single static tenant.
struct StaticUserStore {
    roles: HashMap<String, HashSet<String>>,
}

#[async_trait]
impl UserStore for StaticUserStore {
    async fn is_user_in_role(
        &self,
        username: &str,
        role: &str,
    ) -> Result<bool, Report<DirectoryError>> {
        Ok(self
            .roles
            .get(username)
            .is_some_and(|roles| roles.contains(role)))
    }
}
