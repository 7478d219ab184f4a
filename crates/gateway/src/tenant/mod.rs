//! Tenant resolution from inbound requests.
//!
//! Derives the authoritative tenant for a request from the `Host` header
//! (and, in development mode only, a re-validated `Origin` fallback).
//! Client-supplied tenant fields in the body or query string are never
//! consulted.

mod resolver;
mod source;

pub use resolver::{HostTenantResolver, ResolveError, ResolvedTenant, ResolverSettings};
pub use source::ResolutionSource;
