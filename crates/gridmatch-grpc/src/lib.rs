//! # GridMatch gRPC
//!
//! gRPC service layer using Tonic for the GridMatch matcher service.
//! Exposes `MatcherService` (`RequestJob`/`CheckForJobs`) and the standard
//! health-check service, plus the client used to reach the external job
//! database and job-logging service.

pub mod clients;
pub mod proto;
pub mod server;
pub mod services;

pub use clients::*;
pub use server::*;
pub use services::*;
