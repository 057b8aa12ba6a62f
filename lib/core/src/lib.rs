//! Core types and utilities shared by the QR-code authenticator crates.
//!
//! This crate provides the identifier types that cross crate boundaries
//! (session keys, tenant identifiers) and the rootcause-based `Result`
//! alias used throughout the workspace.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SessionKey, TenantDomain, TenantId};
