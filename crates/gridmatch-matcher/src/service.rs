//! The matcher service: `request_job` and `check_for_jobs`, the two RPCs the
//! whole crate exists to implement.

use crate::claim::{direct_claim_target, ClaimCoordinator, ClaimOutcome};
use crate::expr::{parse, parse_expr, Descriptor, Value};
use crate::queue::QueueReportEntry;
use crate::site_mask::{classify, passes};
use crate::store::JobStore;
use async_trait::async_trait;
use gridmatch_core::error::MatcherError;
use gridmatch_core::id::JobId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The payload handed back to a resource on a successful `request_job`:
/// the job's literal JDL text under `jdl`, its ownership, and its optimizer
/// parameters merged at top level.
///
/// Field precedence on collision: `jdl`, `owner_dn`, and `owner_group` are
/// fixed, always-present fields and always win — `opt_params` is the only
/// variable, job-supplied bag and never overrides them, even if a job
/// happens to carry an optimizer parameter literally named `JDL`, `DN`, or
/// `Group`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub job_id: JobId,
    pub jdl: String,
    pub owner_dn: String,
    pub owner_group: String,
    pub opt_params: HashMap<String, String>,
}

impl JobPayload {
    fn from_claim(claimed: crate::claim::ClaimedJob) -> Self {
        Self {
            job_id: claimed.job_id,
            jdl: claimed.jdl,
            owner_dn: claimed.owner_dn,
            owner_group: claimed.owner_group,
            opt_params: claimed.opt_params,
        }
    }
}

/// Service boundary consumed by the gRPC and REST front ends. Kept as a
/// trait so it can be wired up behind `shaku`'s DI container and swapped for
/// a test double without touching the transport layer.
#[async_trait]
pub trait MatcherService: Send + Sync {
    async fn request_job(&self, resource_jdl: &str) -> Result<JobPayload, MatcherError>;
    async fn check_for_jobs(&self, resource_jdl: &str) -> Result<Vec<QueueReportEntry>, MatcherError>;
}

/// Default `MatcherService` implementation: a `JobStore` port plus the
/// `ClaimCoordinator` that serializes access to it.
pub struct MatcherServiceImpl {
    store: Arc<dyn JobStore>,
    coordinator: Arc<ClaimCoordinator>,
    max_queues_scanned: usize,
}

impl MatcherServiceImpl {
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, max_queues_scanned: usize) -> Self {
        let coordinator = Arc::new(ClaimCoordinator::new(store.clone()));
        Self { store, coordinator, max_queues_scanned }
    }

    fn resource_site(resource_desc: &Descriptor) -> Option<String> {
        match resource_desc.get("Site") {
            Some(Value::Str(site)) => Some(site.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl MatcherService for MatcherServiceImpl {
    #[instrument(skip(self, resource_jdl))]
    async fn request_job(&self, resource_jdl: &str) -> Result<JobPayload, MatcherError> {
        let resource_desc = parse(resource_jdl).map_err(|e| MatcherError::illegal_descriptor(e.to_string()))?;

        let mask = self.store.get_site_mask().await?;
        let agent_site = Self::resource_site(&resource_desc);
        let site_state = classify(agent_site.as_deref(), &mask);

        if let Some(job_id) = direct_claim_target(&resource_desc) {
            return match self.coordinator.claim_direct(job_id, &resource_desc).await? {
                ClaimOutcome::Matched(claimed) => Ok(JobPayload::from_claim(claimed)),
                ClaimOutcome::NoCandidate | ClaimOutcome::Stale { .. } => {
                    Err(MatcherError::AgentDirectedMiss { job_id: job_id.get() })
                }
            };
        }

        let queues = self.store.list_task_queues().await?;
        let site = agent_site.clone().unwrap_or_else(|| "unknown".to_string());

        for queue in queues.into_iter().take(self.max_queues_scanned) {
            let requirements = parse_expr(&queue.requirements_text)
                .map_err(|e| MatcherError::store_error(format!("queue {} has unparsable requirements: {e}", queue.queue_id)))?;

            if !passes(&requirements, agent_site.as_deref(), site_state) {
                continue;
            }

            match self.coordinator.claim(queue.queue_id, &resource_desc).await? {
                ClaimOutcome::Matched(claimed) => return Ok(JobPayload::from_claim(claimed)),
                ClaimOutcome::Stale { evicted_job_ids } => {
                    warn!(queue_id = %queue.queue_id, count = evicted_job_ids.len(), "evicted stale queue entries");
                }
                ClaimOutcome::NoCandidate => {}
            }
        }

        info!(%site, "no match found for resource");
        Err(MatcherError::NoMatch { site })
    }

    #[instrument(skip(self, resource_jdl))]
    async fn check_for_jobs(&self, resource_jdl: &str) -> Result<Vec<QueueReportEntry>, MatcherError> {
        let resource_desc = parse(resource_jdl).map_err(|e| MatcherError::illegal_descriptor(e.to_string()))?;

        let mask = self.store.get_site_mask().await?;
        let agent_site = Self::resource_site(&resource_desc);
        let site_state = classify(agent_site.as_deref(), &mask);

        let queues = self.store.list_task_queues().await?;
        let mut candidate_ids = Vec::new();

        for queue in &queues {
            let requirements = parse_expr(&queue.requirements_text)
                .map_err(|e| MatcherError::store_error(format!("queue {} has unparsable requirements: {e}", queue.queue_id)))?;

            if !passes(&requirements, agent_site.as_deref(), site_state) {
                continue;
            }

            let mut queue_desc = Descriptor::new();
            queue_desc.insert("Requirements", Value::Expr(requirements));
            if crate::expr::evaluate_requirements(&queue_desc, &resource_desc) {
                candidate_ids.push(queue.queue_id);
            }
        }

        self.store.get_task_queue_report(&candidate_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryJobStore, JobRecord, JobStatus};
    use gridmatch_core::id::QueueId;

    fn job(id: u64, jdl: &str) -> JobRecord {
        JobRecord {
            id: JobId(id),
            status: JobStatus::Waiting,
            jdl: jdl.to_string(),
            owner_dn: "/DC=test/CN=alice".to_string(),
            owner_group: "testgroup".to_string(),
            opt_params: HashMap::from([("CPUTime".to_string(), "86400".to_string())]),
        }
    }

    fn service(store: Arc<InMemoryJobStore>) -> MatcherServiceImpl {
        MatcherServiceImpl::new(store, 100)
    }

    #[tokio::test]
    async fn test_request_job_matches_and_carries_jdl_and_opt_params() {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");
        store.seed_queue(QueueId(1), "(other.CPUs >= 2)", 10);
        store.seed_job(QueueId(1), job(100, "[ CPUs = 2; ]"));

        let svc = service(store);
        let payload = svc.request_job(r#"[ CPUs = 4; Site = "CERN"; ]"#).await.unwrap();
        assert_eq!(payload.job_id, JobId(100));
        assert_eq!(payload.jdl, "[ CPUs = 2; ]");
        assert_eq!(payload.owner_dn, "/DC=test/CN=alice");
        assert_eq!(payload.opt_params.get("CPUTime"), Some(&"86400".to_string()));
    }

    #[tokio::test]
    async fn test_request_job_no_match_errors() {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");
        store.seed_queue(QueueId(1), "(other.CPUs >= 64)", 10);
        store.seed_job(QueueId(1), job(100, "[ CPUs = 2; Requirements = (other.CPUs >= 64); ]"));

        let svc = service(store);
        let result = svc.request_job(r#"[ CPUs = 4; Site = "CERN"; ]"#).await;
        assert!(matches!(result, Err(MatcherError::NoMatch { .. })));
    }

    #[tokio::test]
    async fn test_request_job_pinned_miss_is_agent_directed() {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");

        let svc = service(store);
        let result = svc
            .request_job(r#"[ CPUs = 4; Site = "CERN"; Requirements = (other.JobID == 999); ]"#)
            .await;
        assert!(matches!(result, Err(MatcherError::AgentDirectedMiss { job_id: 999 })));
    }

    #[tokio::test]
    async fn test_request_job_banned_site_without_pin_is_no_match() {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");
        store.seed_queue(QueueId(1), "(other.CPUs >= 2)", 10);
        store.seed_job(QueueId(1), job(100, "[ CPUs = 2; ]"));

        let svc = service(store);
        let result = svc.request_job(r#"[ CPUs = 4; Site = "RAL"; ]"#).await;
        assert!(matches!(result, Err(MatcherError::NoMatch { .. })));
    }

    #[tokio::test]
    async fn test_check_for_jobs_reports_matching_queues() {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");
        store.seed_queue(QueueId(1), "(other.CPUs >= 2)", 10);
        store.seed_job(QueueId(1), job(100, "[ CPUs = 2; ]"));
        store.seed_queue(QueueId(2), "(other.CPUs >= 64)", 5);

        let svc = service(store);
        let report = svc.check_for_jobs(r#"[ CPUs = 4; Site = "CERN"; ]"#).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].queue_id, QueueId(1));
        assert_eq!(report[0].waiting_jobs, 1);
    }
}
