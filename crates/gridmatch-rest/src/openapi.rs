//! OpenAPI documentation configuration.
//!
//! This module provides OpenAPI/Swagger documentation generation for the
//! operational REST surface.

use gridmatch_core::error::ErrorResponse;
use utoipa::OpenApi;

use crate::controllers::health_controller::HealthResponse;
use crate::controllers::jobs_controller::{CheckForJobsRequest, CheckForJobsResponse, QueueReportItem};

/// OpenAPI documentation for the GridMatch operational REST surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GridMatch REST API",
        version = "1.0.0",
        description = "Operational HTTP surface for the GridMatch matcher service: health/readiness probes and a thin checkForJobs binding",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::readiness_check,
        crate::controllers::jobs_controller::check_for_jobs,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            CheckForJobsRequest,
            CheckForJobsResponse,
            QueueReportItem,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "jobs", description = "Matcher task-queue inspection")
    )
)]
pub struct ApiDoc;
