//! Remote job store client: the production `JobStore` implementation,
//! talking to the external job database and job-logging service via gRPC.

use crate::proto::common::{Empty, JobStatus as ProtoJobStatus, JobStatusValue};
use crate::proto::job_store::{
    job_store_service_client::JobStoreServiceClient, AddLoggingRecordRequest, GetJobAttributesRequest,
    GetJobJdlRequest, JobIdRequest, QueueIdRequest, SetJobStatusRequest, TaskQueueReportRequest,
};
use async_trait::async_trait;
use gridmatch_core::error::MatcherError;
use gridmatch_core::id::{JobId, QueueId};
use gridmatch_matcher::queue::{QueueReportEntry, TaskQueueSummary};
use gridmatch_matcher::store::{JobStatus, JobStore};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tonic::transport::Channel;
use tracing::debug;

/// `JobStore` backed by a gRPC client against `job_store.JobStoreService`.
pub struct RemoteJobStore {
    client: JobStoreServiceClient<Channel>,
}

impl RemoteJobStore {
    /// Connects to the remote job store, bounding the connection attempt by
    /// `connect_timeout`.
    pub async fn connect(endpoint: &str, connect_timeout: Duration) -> Result<Self, MatcherError> {
        let channel = Channel::from_shared(endpoint.to_string())
            .map_err(|e| MatcherError::Configuration(format!("invalid job store endpoint: {e}")))?
            .connect_timeout(connect_timeout)
            .connect()
            .await
            .map_err(|e| MatcherError::store_error(format!("failed to connect to job store: {e}")))?;

        Ok(Self { client: JobStoreServiceClient::new(channel) })
    }

    /// Wraps an existing channel (used when the job store shares a
    /// connection with other clients in the same process).
    #[must_use]
    pub fn from_channel(channel: Channel) -> Self {
        Self { client: JobStoreServiceClient::new(channel) }
    }
}

fn to_proto_status(status: &JobStatus) -> JobStatusValue {
    let tag = match status {
        JobStatus::Waiting => ProtoJobStatus::Waiting,
        JobStatus::Matched => ProtoJobStatus::Matched,
        JobStatus::Other(_) => ProtoJobStatus::Other,
    };
    JobStatusValue {
        status: tag as i32,
        other_status: match status {
            JobStatus::Other(s) => s.clone(),
            _ => String::new(),
        },
    }
}

fn from_proto_status(value: &JobStatusValue) -> JobStatus {
    match ProtoJobStatus::try_from(value.status).unwrap_or(ProtoJobStatus::Unspecified) {
        ProtoJobStatus::Waiting => JobStatus::Waiting,
        ProtoJobStatus::Matched => JobStatus::Matched,
        _ => JobStatus::Other(value.other_status.clone()),
    }
}

fn map_grpc_error(status: tonic::Status) -> MatcherError {
    match status.code() {
        tonic::Code::DeadlineExceeded => MatcherError::Timeout(status.message().to_string()),
        tonic::Code::Unavailable => MatcherError::CircuitBreakerOpen(status.message().to_string()),
        tonic::Code::InvalidArgument => MatcherError::Validation(status.message().to_string()),
        _ => MatcherError::store_error(format!("job store gRPC error: {}", status.message())),
    }
}

#[async_trait]
impl JobStore for RemoteJobStore {
    async fn get_site_mask(&self) -> Result<HashSet<String>, MatcherError> {
        debug!("Remote GetSiteMask");
        let response = self
            .client
            .clone()
            .get_site_mask(Empty {})
            .await
            .map_err(map_grpc_error)?;
        Ok(response.into_inner().sites.into_iter().collect())
    }

    async fn list_task_queues(&self) -> Result<Vec<TaskQueueSummary>, MatcherError> {
        debug!("Remote ListTaskQueues");
        let response = self
            .client
            .clone()
            .list_task_queues(Empty {})
            .await
            .map_err(map_grpc_error)?;
        Ok(response
            .into_inner()
            .queues
            .into_iter()
            .map(|q| TaskQueueSummary {
                queue_id: QueueId(q.queue_id),
                requirements_text: q.requirements_text,
                priority: q.priority,
            })
            .collect())
    }

    async fn jobs_in_queue(&self, queue_id: QueueId) -> Result<Vec<JobId>, MatcherError> {
        debug!(%queue_id, "Remote JobsInQueue");
        let response = self
            .client
            .clone()
            .jobs_in_queue(QueueIdRequest { queue_id: queue_id.get() })
            .await
            .map_err(map_grpc_error)?;
        Ok(response.into_inner().job_ids.into_iter().map(JobId).collect())
    }

    async fn get_job_jdl(
        &self,
        job_id: JobId,
        status_filter: Option<JobStatus>,
    ) -> Result<Option<String>, MatcherError> {
        debug!(%job_id, "Remote GetJobJdl");
        let response = self
            .client
            .clone()
            .get_job_jdl(GetJobJdlRequest {
                job_id: job_id.get(),
                status_filter: status_filter.as_ref().map(to_proto_status),
            })
            .await
            .map_err(map_grpc_error)?
            .into_inner();

        Ok(response.found.then_some(response.jdl))
    }

    async fn get_job_attributes(
        &self,
        job_id: JobId,
        names: &[&str],
    ) -> Result<HashMap<String, String>, MatcherError> {
        debug!(%job_id, "Remote GetJobAttributes");
        let response = self
            .client
            .clone()
            .get_job_attributes(GetJobAttributesRequest {
                job_id: job_id.get(),
                names: names.iter().map(|s| (*s).to_string()).collect(),
            })
            .await
            .map_err(map_grpc_error)?;
        Ok(response.into_inner().attributes)
    }

    async fn get_job_opt_parameters(&self, job_id: JobId) -> Result<HashMap<String, String>, MatcherError> {
        debug!(%job_id, "Remote GetJobOptParameters");
        let response = self
            .client
            .clone()
            .get_job_opt_parameters(JobIdRequest { job_id: job_id.get() })
            .await
            .map_err(map_grpc_error)?;
        Ok(response.into_inner().attributes)
    }

    async fn set_job_status(&self, job_id: JobId, status: JobStatus, minor: &str) -> Result<(), MatcherError> {
        debug!(%job_id, %status, "Remote SetJobStatus");
        self.client
            .clone()
            .set_job_status(SetJobStatusRequest {
                job_id: job_id.get(),
                status: Some(to_proto_status(&status)),
                minor_status: minor.to_string(),
            })
            .await
            .map_err(map_grpc_error)?;
        Ok(())
    }

    async fn delete_job_from_queue(&self, job_id: JobId) -> Result<(), MatcherError> {
        debug!(%job_id, "Remote DeleteJobFromQueue");
        self.client
            .clone()
            .delete_job_from_queue(JobIdRequest { job_id: job_id.get() })
            .await
            .map_err(map_grpc_error)?;
        Ok(())
    }

    async fn delete_queue(&self, queue_id: QueueId) -> Result<(), MatcherError> {
        debug!(%queue_id, "Remote DeleteQueue");
        self.client
            .clone()
            .delete_queue(QueueIdRequest { queue_id: queue_id.get() })
            .await
            .map_err(map_grpc_error)?;
        Ok(())
    }

    async fn lookup_job_in_queue(&self, job_id: JobId) -> Result<Option<QueueId>, MatcherError> {
        debug!(%job_id, "Remote LookupJobInQueue");
        let response = self
            .client
            .clone()
            .lookup_job_in_queue(JobIdRequest { job_id: job_id.get() })
            .await
            .map_err(map_grpc_error)?
            .into_inner();
        Ok(response.found.then_some(QueueId(response.queue_id)))
    }

    async fn get_task_queue_report(&self, queue_ids: &[QueueId]) -> Result<Vec<QueueReportEntry>, MatcherError> {
        debug!(count = queue_ids.len(), "Remote GetTaskQueueReport");
        let response = self
            .client
            .clone()
            .get_task_queue_report(TaskQueueReportRequest {
                queue_ids: queue_ids.iter().map(|id| id.get()).collect(),
            })
            .await
            .map_err(map_grpc_error)?;
        Ok(response
            .into_inner()
            .entries
            .into_iter()
            .map(|e| QueueReportEntry {
                queue_id: QueueId(e.queue_id),
                priority: e.priority,
                waiting_jobs: e.waiting_jobs,
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
        debug!(%job_id, %status, "Remote AddLoggingRecord");
        self.client
            .clone()
            .add_logging_record(AddLoggingRecordRequest {
                job_id: job_id.get(),
                status: Some(to_proto_status(&status)),
                minor_status: minor.to_string(),
                source: source.to_string(),
            })
            .await
            .map_err(map_grpc_error)?;
        Ok(())
    }
}
