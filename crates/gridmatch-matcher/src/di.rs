//! Dependency injection interface for the matcher module.
//!
//! Provides a Shaku-compatible interface wrapping [`MatcherService`] so gRPC
//! and REST handlers can depend on the trait object rather than a concrete
//! construction path.

use crate::queue::QueueReportEntry;
use crate::service::{JobPayload, MatcherService, MatcherServiceImpl};
use crate::store::JobStore;
use async_trait::async_trait;
use gridmatch_core::error::MatcherError;
use gridmatch_core::Interface;
use std::sync::Arc;

/// Shaku-visible interface over the matcher service.
#[async_trait]
pub trait MatcherServiceInterface: Interface + Send + Sync {
    async fn request_job(&self, resource_jdl: &str) -> Result<JobPayload, MatcherError>;
    async fn check_for_jobs(&self, resource_jdl: &str) -> Result<Vec<QueueReportEntry>, MatcherError>;
}

/// Default `MatcherServiceInterface` implementation, delegating to a
/// [`MatcherServiceImpl`].
pub struct MatcherComponent {
    inner: MatcherServiceImpl,
}

impl MatcherComponent {
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, max_queues_scanned: usize) -> Self {
        Self { inner: MatcherServiceImpl::new(store, max_queues_scanned) }
    }
}

#[async_trait]
impl MatcherServiceInterface for MatcherComponent {
    async fn request_job(&self, resource_jdl: &str) -> Result<JobPayload, MatcherError> {
        self.inner.request_job(resource_jdl).await
    }

    async fn check_for_jobs(&self, resource_jdl: &str) -> Result<Vec<QueueReportEntry>, MatcherError> {
        self.inner.check_for_jobs(resource_jdl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryJobStore;
    use gridmatch_core::id::QueueId;

    #[tokio::test]
    async fn test_matcher_component_delegates_to_inner_service() {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");
        store.seed_queue(QueueId(1), "(true)", 10);

        let component = MatcherComponent::new(store, 100);
        let report = component.check_for_jobs(r#"[ CPUs = 4; Site = "CERN"; ]"#).await.unwrap();
        assert_eq!(report.len(), 1);
    }
}
