//! Tenant directory client interfaces for the QR-code authenticator.
//!
//! The authenticator asks two questions of the directory: which tenant a
//! username belongs to, and whether a user holds a role inside that tenant.
//! Both are expressed as traits so any backend can be plugged in; a
//! config-backed `StaticDirectory` is provided for hosts and tests.

mod directory;
mod error;
mod static_directory;

pub use directory::{Directory, UserStore};
pub use error::DirectoryError;
pub use static_directory::{StaticDirectory, StaticDirectoryConfig, TenantConfig, UserConfig};
