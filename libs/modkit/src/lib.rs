//! Shared service plumbing: RFC 9457 problem responses, the HTTP middleware
//! stack every service mounts, and process shutdown handling.

pub mod api;
pub mod http;
pub mod runtime;

pub use api::problem::{
    bad_request, conflict, internal_error, not_found, service_unavailable, Problem,
    ProblemResponse, ValidationError,
};
pub use crate::http::{with_middleware, HttpOptions};
