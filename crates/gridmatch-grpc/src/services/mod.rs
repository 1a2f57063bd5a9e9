//! gRPC service implementations.

mod health_service;
mod matcher_service;

pub use health_service::*;
pub use matcher_service::*;
