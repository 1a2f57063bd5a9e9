//! `JobStore` port: the trait boundary to the external, authoritative job
//! database and job-logging service, plus an in-memory test double.

use crate::queue::{QueueReportEntry, TaskQueueSummary};
use async_trait::async_trait;
use gridmatch_core::error::MatcherError;
use gridmatch_core::id::{JobId, QueueId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Status of a job as tracked by the job store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Matched,
    /// Any other status (`Done`, `Failed`, `Killed`, ...) — the matcher only
    /// ever distinguishes `Waiting` from "not waiting".
    Other(String),
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Matched => write!(f, "Matched"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A job's descriptor, ownership, and optional parameters as held by the job
/// store — everything the matcher needs to assemble a `JobPayload`.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub jdl: String,
    pub owner_dn: String,
    pub owner_group: String,
    pub opt_params: HashMap<String, String>,
}

/// Port trait to the external job database and job-logging service. Every
/// call is wrapped by `gridmatch-resilience` (circuit breaker, retry,
/// timeout) at the call sites in `claim` and `service`.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_site_mask(&self) -> Result<HashSet<String>, MatcherError>;

    /// Returns queues in non-increasing priority order.
    async fn list_task_queues(&self) -> Result<Vec<TaskQueueSummary>, MatcherError>;

    async fn jobs_in_queue(&self, queue_id: QueueId) -> Result<Vec<JobId>, MatcherError>;

    /// Returns the job's JDL text, or `None` if the job is absent or its
    /// status doesn't match `status_filter` (when provided).
    async fn get_job_jdl(
        &self,
        job_id: JobId,
        status_filter: Option<JobStatus>,
    ) -> Result<Option<String>, MatcherError>;

    async fn get_job_attributes(
        &self,
        job_id: JobId,
        names: &[&str],
    ) -> Result<HashMap<String, String>, MatcherError>;

    async fn get_job_opt_parameters(&self, job_id: JobId) -> Result<HashMap<String, String>, MatcherError>;

    async fn set_job_status(&self, job_id: JobId, status: JobStatus, minor: &str) -> Result<(), MatcherError>;

    /// Removes `job_id` from whichever queue currently lists it.
    async fn delete_job_from_queue(&self, job_id: JobId) -> Result<(), MatcherError>;

    async fn delete_queue(&self, queue_id: QueueId) -> Result<(), MatcherError>;

    async fn lookup_job_in_queue(&self, job_id: JobId) -> Result<Option<QueueId>, MatcherError>;

    async fn get_task_queue_report(&self, queue_ids: &[QueueId]) -> Result<Vec<QueueReportEntry>, MatcherError>;

    async fn add_logging_record(
        &self,
        job_id: JobId,
        status: JobStatus,
        minor: &str,
        source: &str,
    ) -> Result<(), MatcherError>;
}

#[derive(Debug, Clone)]
struct QueueRecord {
    requirements_text: String,
    priority: i64,
    jobs: Vec<JobId>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, JobRecord>,
    queues: HashMap<QueueId, QueueRecord>,
    queue_order: Vec<QueueId>,
    site_mask: HashSet<String>,
    log: Vec<(JobId, JobStatus, String, String)>,
}

/// In-memory `JobStore` test double used by unit and integration tests.
pub struct InMemoryJobStore {
    inner: RwLock<Inner>,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Test/seed helper: register a site as currently accepting work.
    pub fn allow_site(&self, site: impl Into<String>) {
        self.inner.write().site_mask.insert(site.into());
    }

    /// Test/seed helper: creates a queue (in priority-descending insertion
    /// order is the caller's responsibility) and returns its id.
    pub fn seed_queue(&self, queue_id: QueueId, requirements_text: impl Into<String>, priority: i64) {
        let mut inner = self.inner.write();
        inner.queues.insert(
            queue_id,
            QueueRecord { requirements_text: requirements_text.into(), priority, jobs: Vec::new() },
        );
        inner.queue_order.push(queue_id);
        inner.queue_order.sort_by(|a, b| {
            let pa = inner.queues.get(a).map_or(i64::MIN, |q| q.priority);
            let pb = inner.queues.get(b).map_or(i64::MIN, |q| q.priority);
            pb.cmp(&pa)
        });
    }

    /// Test/seed helper: adds a waiting job to a queue.
    pub fn seed_job(&self, queue_id: QueueId, job: JobRecord) {
        let mut inner = self.inner.write();
        inner.queues.entry(queue_id).or_insert_with(|| QueueRecord {
            requirements_text: "(true)".to_string(),
            priority: 0,
            jobs: Vec::new(),
        });
        if let Some(q) = inner.queues.get_mut(&queue_id) {
            q.jobs.push(job.id);
        }
        inner.jobs.insert(job.id, job);
    }

    /// Test helper: current status of a job, for asserting post-conditions.
    #[must_use]
    pub fn status_of(&self, job_id: JobId) -> Option<JobStatus> {
        self.inner.read().jobs.get(&job_id).map(|j| j.status.clone())
    }

    /// Test helper: whether a queue still exists.
    #[must_use]
    pub fn queue_exists(&self, queue_id: QueueId) -> bool {
        self.inner.read().queues.contains_key(&queue_id)
    }

    /// Test helper: whether a job is still listed in any queue.
    #[must_use]
    pub fn job_in_any_queue(&self, job_id: JobId) -> bool {
        self.inner.read().queues.values().any(|q| q.jobs.contains(&job_id))
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get_site_mask(&self) -> Result<HashSet<String>, MatcherError> {
        Ok(self.inner.read().site_mask.clone())
    }

    async fn list_task_queues(&self) -> Result<Vec<TaskQueueSummary>, MatcherError> {
        let inner = self.inner.read();
        Ok(inner
            .queue_order
            .iter()
            .filter_map(|id| {
                inner.queues.get(id).map(|q| TaskQueueSummary {
                    queue_id: *id,
                    requirements_text: q.requirements_text.clone(),
                    priority: q.priority,
                })
            })
            .collect())
    }

    async fn jobs_in_queue(&self, queue_id: QueueId) -> Result<Vec<JobId>, MatcherError> {
        Ok(self.inner.read().queues.get(&queue_id).map(|q| q.jobs.clone()).unwrap_or_default())
    }

    async fn get_job_jdl(
        &self,
        job_id: JobId,
        status_filter: Option<JobStatus>,
    ) -> Result<Option<String>, MatcherError> {
        let inner = self.inner.read();
        Ok(inner.jobs.get(&job_id).and_then(|j| match &status_filter {
            Some(expected) if *expected != j.status => None,
            _ => Some(j.jdl.clone()),
        }))
    }

    async fn get_job_attributes(
        &self,
        job_id: JobId,
        names: &[&str],
    ) -> Result<HashMap<String, String>, MatcherError> {
        let inner = self.inner.read();
        let Some(job) = inner.jobs.get(&job_id) else {
            return Ok(HashMap::new());
        };
        let mut out = HashMap::new();
        for &name in names {
            let value = match name {
                "Status" => Some(job.status.to_string()),
                "OwnerDN" => Some(job.owner_dn.clone()),
                "OwnerGroup" => Some(job.owner_group.clone()),
                _ => None,
            };
            if let Some(v) = value {
                out.insert(name.to_string(), v);
            }
        }
        Ok(out)
    }

    async fn get_job_opt_parameters(&self, job_id: JobId) -> Result<HashMap<String, String>, MatcherError> {
        Ok(self.inner.read().jobs.get(&job_id).map(|j| j.opt_params.clone()).unwrap_or_default())
    }

    async fn set_job_status(&self, job_id: JobId, status: JobStatus, _minor: &str) -> Result<(), MatcherError> {
        let mut inner = self.inner.write();
        match inner.jobs.get_mut(&job_id) {
            Some(job) => {
                job.status = status;
                Ok(())
            }
            None => Err(MatcherError::store_error(format!("job {job_id} not found"))),
        }
    }

    async fn delete_job_from_queue(&self, job_id: JobId) -> Result<(), MatcherError> {
        let mut inner = self.inner.write();
        let mut emptied = Vec::new();
        for (queue_id, queue) in inner.queues.iter_mut() {
            queue.jobs.retain(|id| *id != job_id);
            if queue.jobs.is_empty() {
                emptied.push(*queue_id);
            }
        }
        for queue_id in emptied {
            inner.queues.remove(&queue_id);
            inner.queue_order.retain(|id| *id != queue_id);
        }
        Ok(())
    }

    async fn delete_queue(&self, queue_id: QueueId) -> Result<(), MatcherError> {
        let mut inner = self.inner.write();
        inner.queues.remove(&queue_id);
        inner.queue_order.retain(|id| *id != queue_id);
        Ok(())
    }

    async fn lookup_job_in_queue(&self, job_id: JobId) -> Result<Option<QueueId>, MatcherError> {
        let inner = self.inner.read();
        Ok(inner.queues.iter().find(|(_, q)| q.jobs.contains(&job_id)).map(|(id, _)| *id))
    }

    async fn get_task_queue_report(&self, queue_ids: &[QueueId]) -> Result<Vec<QueueReportEntry>, MatcherError> {
        let inner = self.inner.read();
        Ok(queue_ids
            .iter()
            .filter_map(|id| {
                inner.queues.get(id).map(|q| QueueReportEntry {
                    queue_id: *id,
                    priority: q.priority,
                    waiting_jobs: q.jobs.len() as u64,
                })
            })
            .collect())
    }

    async fn add_logging_record(
        &self,
        job_id: JobId,
        status: JobStatus,
        minor: &str,
        source: &str,
    ) -> Result<(), MatcherError> {
        self.inner.write().log.push((job_id, status, minor.to_string(), source.to_string()));
        Ok(())
    }
}
