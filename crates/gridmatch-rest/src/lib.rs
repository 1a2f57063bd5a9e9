//! # GridMatch REST
//!
//! Operational HTTP surface for the GridMatch matcher service, built on
//! Axum: liveness/readiness probes and a thin `checkForJobs` binding for
//! tooling that prefers HTTP over gRPC. No authentication or user domain
//! lives in this crate — the matcher service has no such concept.

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use openapi::*;
pub use router::*;
pub use state::*;
