//! # GridMatch Core
//!
//! Shared types, traits, and error definitions used by every crate in the
//! matcher workspace: the unified error enum, typed job/queue identifiers,
//! health-check traits, telemetry bootstrap, and request validation helpers.

pub mod error;
pub mod id;
pub mod result;
pub mod telemetry;
pub mod traits;
pub mod validation;

pub use error::*;
pub use id::*;
pub use result::*;
pub use traits::*;
pub use validation::*;

// Re-export shaku for dependency injection across crates.
pub use shaku::Interface;
