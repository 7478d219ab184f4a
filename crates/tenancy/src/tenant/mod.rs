//! Tenant identity and request-scoped tenant context.
//!
//! This module provides the core types for tenant isolation. Every
//! tenant-scoped data access in the platform requires either an explicit
//! [`TenantId`] or an active [`RequestTenantContext`]; there is no ambient
//! global tenant state anywhere in the process.
//!
//! # Core Types
//!
//! - [`TenantId`] - Opaque, validated tenant identifier
//! - [`RequestTenantContext`] - Call-scoped context created at request entry
//! - [`TenantIdentity`] - Read-only directory record for one tenant
//! - [`TenantDirectory`] - Lookup collaborator (subdomain → identity)
//!
//! # Design Philosophy
//!
//! The context is plain data threaded explicitly through call chains (and
//! carried in request extensions at the HTTP layer). Concurrent requests for
//! different tenants can never observe each other's tenant id, because there
//! is nothing shared to observe.

mod context;
mod directory;
mod id;
mod identity;

pub use context::RequestTenantContext;
pub use directory::{StaticTenantDirectory, TenantDirectory};
pub use id::TenantId;
pub use identity::{
    ConnectionDescriptor, CredentialCipher, CredentialError, InstallKind, PlaintextCredentials,
    TenantIdentity, TenantStatus,
};
