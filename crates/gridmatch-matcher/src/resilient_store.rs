//! `ResilientJobStore`: wraps any `JobStore` with a circuit breaker, retry
//! policy, and timeout, the same shape `gridmatch-resilience` already gives
//! the teacher's own outbound repository calls, generalized to the
//! matcher's job-store port.
//!
//! Idempotent reads are retried unconditionally with backoff. Claim-writing
//! calls are retried only when the failure is a transport-level timeout or
//! a rejection from an already-open circuit — never for a logical error
//! returned by the store itself, and never once a write has actually run
//! and failed for a reason other than "it never reached the store".

use crate::queue::{QueueReportEntry, TaskQueueSummary};
use crate::store::{JobStatus, JobStore};
use async_trait::async_trait;
use gridmatch_config::{JobStoreConfig, ResilienceConfig};
use gridmatch_core::error::MatcherError;
use gridmatch_core::id::{JobId, QueueId};
use gridmatch_resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use gridmatch_resilience::retry::RetryPolicy;
use gridmatch_resilience::timeout::with_timeout;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub struct ResilientJobStore {
    inner: Arc<dyn JobStore>,
    breaker: CircuitBreaker,
    read_retry: RetryPolicy,
    write_retry: RetryPolicy,
    timeout: Duration,
}

impl ResilientJobStore {
    pub fn new(
        inner: Arc<dyn JobStore>,
        breaker_config: CircuitBreakerConfig,
        read_retry: RetryPolicy,
        write_retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new("job-store", breaker_config),
            read_retry,
            write_retry,
            timeout,
        }
    }

    /// Builds a resilient wrapper tuned from the job-store client's call
    /// timeout and the resilience section's breaker/retry tuning.
    pub fn from_config(
        inner: Arc<dyn JobStore>,
        job_store_config: &JobStoreConfig,
        resilience_config: &ResilienceConfig,
    ) -> Self {
        Self::new(
            inner,
            resilience_config.circuit_breaker_config(),
            resilience_config.read_retry_policy(),
            resilience_config.write_retry_policy(),
            job_store_config.call_timeout(),
        )
    }

    /// Runs an idempotent read through the breaker, timeout, and unconditional retry.
    async fn read<T, F, Fut>(&self, f: F) -> Result<T, MatcherError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, MatcherError>>,
    {
        let mut last_err = None;
        for attempt in 0..self.read_retry.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.read_retry.delay_for_attempt(attempt)).await;
            }
            match self.breaker.call(|| with_timeout(self.timeout, &f)).await {
                Ok(value) => return Ok(value),
                Err(CircuitBreakerError::Open(name)) => {
                    last_err = Some(MatcherError::CircuitBreakerOpen(name));
                }
                Err(CircuitBreakerError::Failure(inner)) => {
                    last_err = Some(inner);
                }
            }
        }
        Err(last_err.expect("read loop always makes at least one attempt"))
    }

    /// Runs a claim-writing call through the breaker and timeout, retrying
    /// only while the failure is transient transport (open circuit or
    /// timeout) and never after the store has actually rejected the write
    /// for a logical reason.
    async fn write<T, F, Fut>(&self, f: F) -> Result<T, MatcherError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, MatcherError>>,
    {
        let mut last_err = None;
        for attempt in 0..self.write_retry.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.write_retry.delay_for_attempt(attempt)).await;
            }
            match self.breaker.call(|| with_timeout(self.timeout, &f)).await {
                Ok(value) => return Ok(value),
                Err(CircuitBreakerError::Open(name)) => {
                    last_err = Some(MatcherError::CircuitBreakerOpen(name));
                    continue;
                }
                Err(CircuitBreakerError::Failure(inner)) => {
                    let transient = matches!(inner, MatcherError::Timeout(_));
                    last_err = Some(inner);
                    if !transient {
                        break;
                    }
                }
            }
        }
        Err(last_err.expect("write loop always makes at least one attempt"))
    }
}

#[async_trait]
impl JobStore for ResilientJobStore {
    async fn get_site_mask(&self) -> Result<HashSet<String>, MatcherError> {
        self.read(|| self.inner.get_site_mask()).await
    }

    async fn list_task_queues(&self) -> Result<Vec<TaskQueueSummary>, MatcherError> {
        self.read(|| self.inner.list_task_queues()).await
    }

    async fn jobs_in_queue(&self, queue_id: QueueId) -> Result<Vec<JobId>, MatcherError> {
        self.read(|| self.inner.jobs_in_queue(queue_id)).await
    }

    async fn get_job_jdl(
        &self,
        job_id: JobId,
        status_filter: Option<JobStatus>,
    ) -> Result<Option<String>, MatcherError> {
        self.read(|| self.inner.get_job_jdl(job_id, status_filter.clone())).await
    }

    async fn get_job_attributes(
        &self,
        job_id: JobId,
        names: &[&str],
    ) -> Result<HashMap<String, String>, MatcherError> {
        self.read(|| self.inner.get_job_attributes(job_id, names)).await
    }

    async fn get_job_opt_parameters(&self, job_id: JobId) -> Result<HashMap<String, String>, MatcherError> {
        self.read(|| self.inner.get_job_opt_parameters(job_id)).await
    }

    async fn set_job_status(&self, job_id: JobId, status: JobStatus, minor: &str) -> Result<(), MatcherError> {
        self.write(|| self.inner.set_job_status(job_id, status.clone(), minor)).await
    }

    async fn delete_job_from_queue(&self, job_id: JobId) -> Result<(), MatcherError> {
        self.write(|| self.inner.delete_job_from_queue(job_id)).await
    }

    async fn delete_queue(&self, queue_id: QueueId) -> Result<(), MatcherError> {
        self.write(|| self.inner.delete_queue(queue_id)).await
    }

    async fn lookup_job_in_queue(&self, job_id: JobId) -> Result<Option<QueueId>, MatcherError> {
        self.read(|| self.inner.lookup_job_in_queue(job_id)).await
    }

    async fn get_task_queue_report(&self, queue_ids: &[QueueId]) -> Result<Vec<QueueReportEntry>, MatcherError> {
        self.read(|| self.inner.get_task_queue_report(queue_ids)).await
    }

    async fn add_logging_record(
        &self,
        job_id: JobId,
        status: JobStatus,
        minor: &str,
        source: &str,
    ) -> Result<(), MatcherError> {
        self.write(|| self.inner.add_logging_record(job_id, status.clone(), minor, source)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryJobStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyStore {
        inner: InMemoryJobStore,
        failures_left: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn get_site_mask(&self) -> Result<HashSet<String>, MatcherError> {
            if self.failures_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            }).is_ok() {
                return Err(MatcherError::Timeout("simulated transport timeout".into()));
            }
            self.inner.get_site_mask().await
        }

        async fn list_task_queues(&self) -> Result<Vec<TaskQueueSummary>, MatcherError> {
            self.inner.list_task_queues().await
        }

        async fn jobs_in_queue(&self, queue_id: QueueId) -> Result<Vec<JobId>, MatcherError> {
            self.inner.jobs_in_queue(queue_id).await
        }

        async fn get_job_jdl(
            &self,
            job_id: JobId,
            status_filter: Option<JobStatus>,
        ) -> Result<Option<String>, MatcherError> {
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

        async fn delete_job_from_queue(&self, _job_id: JobId) -> Result<(), MatcherError> {
            Err(MatcherError::StoreError("job already gone".into()))
        }

        async fn delete_queue(&self, queue_id: QueueId) -> Result<(), MatcherError> {
            self.inner.delete_queue(queue_id).await
        }

        async fn lookup_job_in_queue(&self, job_id: JobId) -> Result<Option<QueueId>, MatcherError> {
            self.inner.lookup_job_in_queue(job_id).await
        }

        async fn get_task_queue_report(&self, queue_ids: &[QueueId]) -> Result<Vec<QueueReportEntry>, MatcherError> {
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

    fn wrapper(inner: Arc<dyn JobStore>) -> ResilientJobStore {
        ResilientJobStore::new(
            inner,
            CircuitBreakerConfig::default(),
            RetryPolicy::with_max_attempts(3),
            RetryPolicy::with_max_attempts(2),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_read_retries_past_transient_timeout() {
        let flaky = Arc::new(FlakyStore {
            inner: InMemoryJobStore::new(),
            failures_left: std::sync::atomic::AtomicU32::new(2),
        });
        flaky.inner.allow_site("CERN");
        let store = wrapper(flaky);

        let mask = store.get_site_mask().await.expect("should succeed after retries");
        assert!(mask.contains("CERN"));
    }

    #[tokio::test]
    async fn test_write_does_not_retry_logical_rejection() {
        let flaky = Arc::new(FlakyStore {
            inner: InMemoryJobStore::new(),
            failures_left: std::sync::atomic::AtomicU32::new(0),
        });
        let store = wrapper(flaky);

        let err = store.delete_job_from_queue(JobId(1)).await.unwrap_err();
        assert!(matches!(err, MatcherError::StoreError(_)));
    }

    #[tokio::test]
    async fn test_read_delegates_to_inner_on_success() {
        let inner = Arc::new(InMemoryJobStore::new());
        inner.allow_site("CERN");
        let store = wrapper(inner);

        let mask = store.get_site_mask().await.unwrap();
        assert!(mask.contains("CERN"));
    }
}
