//! Remote client for the external job database and job-logging service.

mod remote_job_store;

pub use remote_job_store::*;
