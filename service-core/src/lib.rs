//! service-core: shared infrastructure for the MomentShare backend.
pub mod error;
pub mod middleware;
pub mod observability;
