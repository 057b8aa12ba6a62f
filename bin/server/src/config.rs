//! Centralized server configuration.
//!
//! Loaded via the `config` crate from an optional TOML file named by
//! `QRAUTH_CONFIG`, overridden by `QRAUTH__`-prefixed environment variables
//! (`QRAUTH__AUTHENTICATOR__ROLE_NAME=...`).
//!
//! See [`AuthenticatorConfig`] for authenticator settings and
//! [`StaticDirectoryConfig`] for tenant declarations.

use qr_authenticator::AuthenticatorConfig;
use qr_authenticator_directory::StaticDirectoryConfig;
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_VAR: &str = "QRAUTH_CONFIG";

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Lifetime of an unfinished login attempt, in seconds.
    #[serde(default = "default_attempt_ttl_seconds")]
    pub attempt_ttl_seconds: u64,

    /// Interval between expired-attempt purges, in seconds.
    #[serde(default = "default_purge_interval_seconds")]
    pub purge_interval_seconds: u64,

    /// QR authenticator configuration.
    #[serde(default)]
    pub authenticator: AuthenticatorConfig,

    /// Tenants, users, and role grants.
    #[serde(default)]
    pub directory: StaticDirectoryConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_attempt_ttl_seconds() -> u64 {
    600
}

fn default_purge_interval_seconds() -> u64 {
    60
}

impl ServerConfig {
    /// Loads configuration from the file named by `QRAUTH_CONFIG`, if set,
    /// and from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the result is invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let file = std::env::var_os(CONFIG_FILE_VAR);
        Self::load(file.as_deref().map(Path::new))
    }

    /// Loads configuration from `file` and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the result is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("QRAUTH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.attempt_ttl_seconds == 0 {
            return Err(config::ConfigError::Message(
                "attempt_ttl_seconds must be at least 1".to_string(),
            ));
        }
        if self.purge_interval_seconds == 0 {
            return Err(config::ConfigError::Message(
                "purge_interval_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
