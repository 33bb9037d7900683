//! Thin per-resource wrappers over the request façade
//!
//! Pure parameter marshaling: each method builds a path (and query string or
//! JSON body) and routes through [`crate::FarmLinkClient::request`].
//! Responses stay opaque JSON — the backend owns the entity shapes.
//! Mutations perform the coarse-grained cache invalidation for their
//! resource so page-level callers stay out of cache bookkeeping.

pub mod admin;
pub mod applications;
pub mod jobs;
pub mod profiles;
pub mod uploads;
