//! Thin HTTP binding of `checkForJobs` for tooling that prefers REST over gRPC.

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::extractors::ValidatedJson;
use crate::responses::{ok, ApiResult};
use crate::state::AppState;

/// Create the jobs router.
pub fn router() -> Router<AppState> {
    Router::new().route("/check", post(check_for_jobs))
}

/// Request body for `POST /api/v1/jobs/check`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckForJobsRequest {
    /// The resource's JDL describing the slot offered to the matcher.
    #[validate(length(min = 1, message = "resource_jdl must not be empty"))]
    pub resource_jdl: String,
}

/// Response body for `POST /api/v1/jobs/check`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckForJobsResponse {
    pub queues: Vec<QueueReportItem>,
}

/// One matching task queue in the report.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueReportItem {
    pub queue_id: u64,
    pub priority: i64,
    pub waiting_jobs: u64,
}

/// Reports which task queues currently hold a job matching the resource's
/// requirements, without claiming anything.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/check",
    tag = "jobs",
    request_body = CheckForJobsRequest,
    responses(
        (status = 200, description = "Matching task queues", body = CheckForJobsResponse),
        (status = 400, description = "Illegal resource JDL", body = ErrorResponse),
        (status = 422, description = "Request failed validation", body = ErrorResponse)
    )
)]
pub async fn check_for_jobs(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CheckForJobsRequest>,
) -> ApiResult<CheckForJobsResponse> {
    let report = state
        .matcher
        .check_for_jobs(&request.resource_jdl)
        .await
        .map_err(crate::responses::AppError::from)?;

    let queues = report
        .into_iter()
        .map(|entry| QueueReportItem {
            queue_id: entry.queue_id.get(),
            priority: entry.priority,
            waiting_jobs: entry.waiting_jobs,
        })
        .collect();

    ok(CheckForJobsResponse { queues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use gridmatch_matcher::di::MatcherComponent;
    use gridmatch_matcher::store::InMemoryJobStore;
    use gridmatch_core::id::QueueId;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let store = Arc::new(InMemoryJobStore::new());
        store.allow_site("CERN");
        store.seed_queue(QueueId(1), r#"[ CPUs = 4; ]"#, 10);

        AppState::new(Arc::new(MatcherComponent::new(store, 100)))
    }

    async fn parse_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_check_for_jobs_reports_matching_queue() {
        let router = router().with_state(test_state());

        let body = json!({
            "resource_jdl": r#"[ CPUs = 8; Site = "CERN"; ]"#
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri("/check")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = parse_body(response.into_body()).await;
        assert!(body["success"].as_bool().unwrap());
        assert_eq!(body["data"]["queues"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_check_for_jobs_rejects_empty_jdl() {
        let router = router().with_state(test_state());

        let body = json!({ "resource_jdl": "" });

        let request = Request::builder()
            .method(Method::POST)
            .uri("/check")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
