//! Claim coordination: the sole component allowed to transition a job out of
//! `Waiting`. Guards the critical region spanning "pick a candidate, re-check
//! it is still `Waiting`, transition it to `Matched`, evict it from the queue
//! index" so that two concurrent `requestJob` calls can never both win the
//! same job.

use crate::expr::find_job_id_hint;
use crate::matching::match_descriptors;
use crate::store::{JobStatus, JobStore};
use gridmatch_core::error::MatcherError;
use gridmatch_core::id::{JobId, QueueId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::expr::Descriptor;

/// A successfully claimed job, with everything `service` needs to assemble a
/// `JobPayload`.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job_id: JobId,
    /// The job's literal JDL text, exactly as fetched from the job store.
    pub jdl: String,
    pub job_desc: Descriptor,
    pub owner_dn: String,
    pub owner_group: String,
    pub opt_params: HashMap<String, String>,
}

/// Outcome of a claim attempt.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// A job was claimed and transitioned to `Matched`.
    Matched(ClaimedJob),
    /// No `Waiting` candidate satisfied the resource's requirements.
    NoCandidate,
    /// No candidate was claimed, but one or more queue entries were found to
    /// already be non-`Waiting` and were evicted from the index as a result.
    Stale { evicted_job_ids: Vec<JobId> },
}

/// Owns the single exclusion primitive serializing all claims. Shared across
/// the service via `Arc`, never reconstructed per-request.
pub struct ClaimCoordinator {
    store: Arc<dyn JobStore>,
    lock: Mutex<()>,
}

impl ClaimCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store, lock: Mutex::new(()) }
    }

    /// Claims a specific job named by `job_id`, bypassing queue scanning.
    /// Used when the resource's `Requirements` pins an exact `JobID` (see
    /// [`find_job_id_hint`]).
    pub async fn claim_direct(&self, job_id: JobId, resource_desc: &Descriptor) -> Result<ClaimOutcome, MatcherError> {
        let _permit = self.lock.lock().await;

        let Some(jdl) = self.store.get_job_jdl(job_id, Some(JobStatus::Waiting)).await? else {
            self.store.delete_job_from_queue(job_id).await?;
            return Ok(ClaimOutcome::Stale { evicted_job_ids: vec![job_id] });
        };

        let job_desc = crate::expr::parse(&jdl).map_err(|e| {
            MatcherError::store_error(format!("job {job_id} has unparsable JDL: {e}"))
        })?;

        let outcome = match_descriptors(resource_desc, &job_desc);
        if !outcome.symmetric() {
            return Ok(ClaimOutcome::NoCandidate);
        }

        self.finalize_claim(job_id, jdl, job_desc).await
    }

    /// Scans `queue_id` in index order for the first `Waiting` job whose
    /// requirements match `resource_desc` two-way, claiming the first hit.
    /// Entries observed to already be non-`Waiting` are evicted along the way
    /// rather than left to poison future scans.
    pub async fn claim(&self, queue_id: QueueId, resource_desc: &Descriptor) -> Result<ClaimOutcome, MatcherError> {
        let _permit = self.lock.lock().await;

        let job_ids = match self.store.jobs_in_queue(queue_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(%queue_id, error = %e, "failed to list queue jobs; skipping queue this scan");
                return Ok(ClaimOutcome::NoCandidate);
            }
        };

        if job_ids.is_empty() {
            if let Err(e) = self.store.delete_queue(queue_id).await {
                warn!(%queue_id, error = %e, "failed to delete empty queue");
            }
            return Ok(ClaimOutcome::NoCandidate);
        }

        let mut evicted = Vec::new();

        for job_id in job_ids {
            let jdl = match self.store.get_job_jdl(job_id, Some(JobStatus::Waiting)).await {
                Ok(Some(jdl)) => jdl,
                Ok(None) => {
                    warn!(%job_id, "evicting stale queue entry");
                    self.store.delete_job_from_queue(job_id).await?;
                    evicted.push(job_id);
                    continue;
                }
                Err(e) => {
                    warn!(%job_id, error = %e, "failed to fetch job JDL; skipping job this scan");
                    continue;
                }
            };

            let job_desc = match crate::expr::parse(&jdl) {
                Ok(desc) => desc,
                Err(e) => {
                    warn!(%job_id, error = %e, "evicting job with unparsable JDL");
                    self.store.delete_job_from_queue(job_id).await?;
                    evicted.push(job_id);
                    continue;
                }
            };

            let outcome = match_descriptors(resource_desc, &job_desc);
            if !outcome.symmetric() {
                continue;
            }

            return self.finalize_claim(job_id, jdl, job_desc).await;
        }

        if evicted.is_empty() {
            Ok(ClaimOutcome::NoCandidate)
        } else {
            Ok(ClaimOutcome::Stale { evicted_job_ids: evicted })
        }
    }

    async fn finalize_claim(&self, job_id: JobId, jdl: String, job_desc: Descriptor) -> Result<ClaimOutcome, MatcherError> {
        self.store.set_job_status(job_id, JobStatus::Matched, "Assigned").await?;
        self.store.delete_job_from_queue(job_id).await?;
        self.store
            .add_logging_record(job_id, JobStatus::Matched, "Assigned", "Matcher")
            .await?;

        let attrs = self.store.get_job_attributes(job_id, &["OwnerDN", "OwnerGroup"]).await?;
        let opt_params = self.store.get_job_opt_parameters(job_id).await?;

        debug!(%job_id, "claimed job");

        Ok(ClaimOutcome::Matched(ClaimedJob {
            job_id,
            jdl,
            job_desc,
            owner_dn: attrs.get("OwnerDN").cloned().unwrap_or_default(),
            owner_group: attrs.get("OwnerGroup").cloned().unwrap_or_default(),
            opt_params,
        }))
    }
}

/// Returns the job id a resource's `Requirements` pins, if any — the signal
/// that a claim should go through [`ClaimCoordinator::claim_direct`] instead
/// of [`ClaimCoordinator::claim`].
#[must_use]
pub fn direct_claim_target(resource_desc: &Descriptor) -> Option<JobId> {
    find_job_id_hint(&resource_desc.requirements()).map(JobId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryJobStore, JobRecord};
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;

    fn resource(text: &str) -> Descriptor {
        crate::expr::parse(text).unwrap()
    }

    fn waiting_job(id: u64, jdl: &str) -> JobRecord {
        JobRecord {
            id: JobId(id),
            status: JobStatus::Waiting,
            jdl: jdl.to_string(),
            owner_dn: "/DC=test/CN=alice".to_string(),
            owner_group: "testgroup".to_string(),
            opt_params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_claim_matches_and_evicts_from_queue() {
        let store = Arc::new(InMemoryJobStore::new());
        store.seed_queue(QueueId(1), "(other.CPUs >= 2)", 10);
        store.seed_job(QueueId(1), waiting_job(100, "[ CPUs = 2; ]"));

        let coordinator = ClaimCoordinator::new(store.clone());
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim(QueueId(1), &resource).await.unwrap();
        match outcome {
            ClaimOutcome::Matched(claimed) => assert_eq!(claimed.job_id, JobId(100)),
            other => panic!("expected Matched, got {other:?}"),
        }
        assert_eq!(store.status_of(JobId(100)), Some(JobStatus::Matched));
        assert!(!store.job_in_any_queue(JobId(100)));
    }

    #[tokio::test]
    async fn test_claim_no_candidate_on_empty_queue() {
        let store = Arc::new(InMemoryJobStore::new());
        store.seed_queue(QueueId(1), "(true)", 10);

        let coordinator = ClaimCoordinator::new(store.clone());
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim(QueueId(1), &resource).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::NoCandidate));
        assert!(!store.queue_exists(QueueId(1)), "empty queue should be deleted on discovery");
    }

    #[tokio::test]
    async fn test_claim_evicts_stale_entry_then_reports_stale() {
        let store = Arc::new(InMemoryJobStore::new());
        store.seed_queue(QueueId(1), "(true)", 10);
        let mut stale = waiting_job(100, "[ CPUs = 2; ]");
        stale.status = JobStatus::Matched;
        store.seed_job(QueueId(1), stale);

        let coordinator = ClaimCoordinator::new(store.clone());
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim(QueueId(1), &resource).await.unwrap();
        match outcome {
            ClaimOutcome::Stale { evicted_job_ids } => assert_eq!(evicted_job_ids, vec![JobId(100)]),
            other => panic!("expected Stale, got {other:?}"),
        }
        assert!(!store.job_in_any_queue(JobId(100)));
    }

    #[tokio::test]
    async fn test_claim_direct_hits_pinned_job() {
        let store = Arc::new(InMemoryJobStore::new());
        store.seed_queue(QueueId(1), "(true)", 10);
        store.seed_job(QueueId(1), waiting_job(200, "[ CPUs = 2; ]"));

        let coordinator = ClaimCoordinator::new(store.clone());
        let resource = resource("[ CPUs = 4; Requirements = (other.JobID == 200); ]");
        let target = direct_claim_target(&resource);
        assert_eq!(target, Some(JobId(200)));

        let outcome = coordinator.claim_direct(target.unwrap(), &resource).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Matched(_)));
    }

    #[tokio::test]
    async fn test_claim_direct_missing_job_is_stale() {
        let store = Arc::new(InMemoryJobStore::new());
        let coordinator = ClaimCoordinator::new(store);
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim_direct(JobId(999), &resource).await.unwrap();
        match outcome {
            ClaimOutcome::Stale { evicted_job_ids } => assert_eq!(evicted_job_ids, vec![JobId(999)]),
            other => panic!("expected Stale, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_claim_mismatched_requirements_is_no_candidate() {
        let store = Arc::new(InMemoryJobStore::new());
        store.seed_queue(QueueId(1), "(other.CPUs >= 8)", 10);
        store.seed_job(QueueId(1), waiting_job(300, "[ CPUs = 2; Requirements = (other.CPUs >= 8); ]"));

        let coordinator = ClaimCoordinator::new(store);
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim(QueueId(1), &resource).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::NoCandidate));
    }

    /// Wraps an `InMemoryJobStore` and fails `jobs_in_queue`/`get_job_jdl`
    /// once each, exercising the "log and continue" scan-failure path
    /// instead of aborting the whole claim attempt.
    struct FlakyReadStore {
        inner: InMemoryJobStore,
        fail_jobs_in_queue_once: std::sync::atomic::AtomicBool,
        fail_get_job_jdl_once: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl JobStore for FlakyReadStore {
        async fn get_site_mask(&self) -> Result<HashSet<String>, MatcherError> {
            self.inner.get_site_mask().await
        }

        async fn list_task_queues(&self) -> Result<Vec<crate::queue::TaskQueueSummary>, MatcherError> {
            self.inner.list_task_queues().await
        }

        async fn jobs_in_queue(&self, queue_id: QueueId) -> Result<Vec<JobId>, MatcherError> {
            if self
                .fail_jobs_in_queue_once
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(MatcherError::store_error("simulated jobs_in_queue failure"));
            }
            self.inner.jobs_in_queue(queue_id).await
        }

        async fn get_job_jdl(
            &self,
            job_id: JobId,
            status_filter: Option<JobStatus>,
        ) -> Result<Option<String>, MatcherError> {
            if self
                .fail_get_job_jdl_once
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(MatcherError::store_error("simulated get_job_jdl failure"));
            }
            self.inner.get_job_jdl(job_id, status_filter).await
        }

        async fn get_job_attributes(
            &self,
            job_id: JobId,
            names: &[&str],
        ) -> Result<HashMap<String, String>, MatcherError> {
            self.inner.get_job_attributes(job_id, names).await
        }

        async fn get_job_opt_parameters(&self, job_id: JobId) -> Result<HashMap<String, String>, MatcherError> {
            self.inner.get_job_opt_parameters(job_id).await
        }

        async fn set_job_status(&self, job_id: JobId, status: JobStatus, minor: &str) -> Result<(), MatcherError> {
            self.inner.set_job_status(job_id, status, minor).await
        }

        async fn delete_job_from_queue(&self, job_id: JobId) -> Result<(), MatcherError> {
            self.inner.delete_job_from_queue(job_id).await
        }

        async fn delete_queue(&self, queue_id: QueueId) -> Result<(), MatcherError> {
            self.inner.delete_queue(queue_id).await
        }

        async fn lookup_job_in_queue(&self, job_id: JobId) -> Result<Option<QueueId>, MatcherError> {
            self.inner.lookup_job_in_queue(job_id).await
        }

        async fn get_task_queue_report(
            &self,
            queue_ids: &[QueueId],
        ) -> Result<Vec<crate::queue::QueueReportEntry>, MatcherError> {
            self.inner.get_task_queue_report(queue_ids).await
        }

        async fn add_logging_record(
            &self,
            job_id: JobId,
            status: JobStatus,
            minor: &str,
            source: &str,
        ) -> Result<(), MatcherError> {
            self.inner.add_logging_record(job_id, status, minor, source).await
        }
    }

    #[tokio::test]
    async fn test_claim_logs_and_continues_on_jobs_in_queue_error() {
        let flaky = Arc::new(FlakyReadStore {
            inner: InMemoryJobStore::new(),
            fail_jobs_in_queue_once: std::sync::atomic::AtomicBool::new(true),
            fail_get_job_jdl_once: std::sync::atomic::AtomicBool::new(false),
        });
        flaky.inner.seed_queue(QueueId(1), "(true)", 10);
        flaky.inner.seed_job(QueueId(1), waiting_job(100, "[ CPUs = 2; ]"));

        let coordinator = ClaimCoordinator::new(flaky);
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim(QueueId(1), &resource).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::NoCandidate), "a read failure should be logged, not propagated");
    }

    #[tokio::test]
    async fn test_claim_skips_job_on_get_job_jdl_error_and_tries_next() {
        let flaky = Arc::new(FlakyReadStore {
            inner: InMemoryJobStore::new(),
            fail_jobs_in_queue_once: std::sync::atomic::AtomicBool::new(false),
            fail_get_job_jdl_once: std::sync::atomic::AtomicBool::new(true),
        });
        flaky.inner.seed_queue(QueueId(1), "(true)", 10);
        flaky.inner.seed_job(QueueId(1), waiting_job(100, "[ CPUs = 2; ]"));
        flaky.inner.seed_job(QueueId(1), waiting_job(101, "[ CPUs = 2; ]"));

        let coordinator = ClaimCoordinator::new(flaky);
        let resource = resource("[ CPUs = 4; ]");

        let outcome = coordinator.claim(QueueId(1), &resource).await.unwrap();
        match outcome {
            ClaimOutcome::Matched(claimed) => assert_eq!(claimed.job_id, JobId(101)),
            other => panic!("expected the second job to be claimed after the first's read failed, got {other:?}"),
        }
    }
}
