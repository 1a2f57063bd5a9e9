//! gRPC service implementation exposing `MatcherServiceInterface` as
//! `matcher.MatcherService`.

use crate::proto::matcher::{
    matcher_service_server::MatcherService as MatcherServiceRpc, CheckForJobsRequest, CheckForJobsResponse,
    JobPayload as ProtoJobPayload, QueueReportEntry as ProtoQueueReportEntry, RequestJobRequest, RequestJobResponse,
};
use gridmatch_matcher::di::MatcherServiceInterface;
use gridmatch_matcher::service::JobPayload;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

/// `matcher.MatcherService` gRPC implementation, delegating to a
/// [`MatcherServiceInterface`].
pub struct MatcherGrpcService {
    matcher: Arc<dyn MatcherServiceInterface>,
}

impl MatcherGrpcService {
    #[must_use]
    pub fn new(matcher: Arc<dyn MatcherServiceInterface>) -> Self {
        Self { matcher }
    }
}

fn to_proto_payload(payload: JobPayload) -> ProtoJobPayload {
    ProtoJobPayload {
        job_id: payload.job_id.get(),
        owner_dn: payload.owner_dn,
        owner_group: payload.owner_group,
        opt_params: payload.opt_params,
        jdl: payload.jdl,
    }
}

fn to_proto_queue_entry(entry: gridmatch_matcher::queue::QueueReportEntry) -> ProtoQueueReportEntry {
    ProtoQueueReportEntry {
        queue_id: entry.queue_id.get(),
        priority: entry.priority,
        waiting_jobs: entry.waiting_jobs,
    }
}

#[tonic::async_trait]
impl MatcherServiceRpc for MatcherGrpcService {
    async fn request_job(
        &self,
        request: Request<RequestJobRequest>,
    ) -> Result<Response<RequestJobResponse>, Status> {
        let req = request.into_inner();
        debug!("RequestJob");

        match self.matcher.request_job(&req.resource_jdl).await {
            Ok(payload) => Ok(Response::new(RequestJobResponse {
                ok: true,
                value: Some(to_proto_payload(payload)),
                error_code: String::new(),
                message: String::new(),
            })),
            Err(err) => Ok(Response::new(RequestJobResponse {
                ok: false,
                value: None,
                error_code: err.error_code().to_string(),
                message: err.to_string(),
            })),
        }
    }

    async fn check_for_jobs(
        &self,
        request: Request<CheckForJobsRequest>,
    ) -> Result<Response<CheckForJobsResponse>, Status> {
        let req = request.into_inner();
        debug!("CheckForJobs");

        match self.matcher.check_for_jobs(&req.resource_jdl).await {
            Ok(entries) => Ok(Response::new(CheckForJobsResponse {
                ok: true,
                queues: entries.into_iter().map(to_proto_queue_entry).collect(),
                error_code: String::new(),
                message: String::new(),
            })),
            Err(err) => Ok(Response::new(CheckForJobsResponse {
                ok: false,
                queues: Vec::new(),
                error_code: err.error_code().to_string(),
                message: err.to_string(),
            })),
        }
    }
}
