//! Unified error types for all layers of the matcher service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type spanning descriptor parsing, matching, job-store access,
/// and claim coordination.
#[derive(Error, Debug)]
pub enum MatcherError {
    /// The resource descriptor submitted by the caller failed to parse or had
    /// a malformed `Requirements` expression.
    #[error("Illegal resource JDL: {0}")]
    IllegalDescriptor(String),

    /// A request DTO at the REST/gRPC boundary failed field-level validation
    /// before it ever reached descriptor parsing.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A specific candidate job's descriptor was malformed. Callers treat this
    /// as "skip this job/queue", not as a request-level failure.
    #[error("Illegal job descriptor for job {job_id}: {reason}")]
    IllegalJobDescriptor { job_id: u64, reason: String },

    /// No waiting job in any task queue satisfies the resource's requirements.
    #[error("No match found for site: {site}")]
    NoMatch { site: String },

    /// The agent requested a specific job by id, and that job was absent from
    /// the queue or failed to match. Distinct from `NoMatch` so callers can
    /// tell the two apart in logs, though both surface the same way over RPC.
    #[error("Agent-directed job {job_id} not available")]
    AgentDirectedMiss { job_id: u64 },

    /// The external job store returned an error or inconsistent data.
    #[error("Job store error: {0}")]
    StoreError(String),

    /// Evaluating a `Requirements` expression failed (unknown attribute,
    /// type mismatch). Never escapes the evaluator — always folded to
    /// `false` by the caller. Kept as a variant so the evaluator's internal
    /// signature stays honest about failure, and exposed for tests that
    /// want to assert this path is hit.
    #[error("Expression evaluation error: {0}")]
    ExpressionEvalError(String),

    /// Resilience layer tripped its breaker for a dependency.
    #[error("Service unavailable: circuit breaker open for {0}")]
    CircuitBreakerOpen(String),

    /// A call to a dependency exceeded its deadline.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration is invalid or missing required values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catch-all for unexpected internal failures.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper for `anyhow`-sourced failures deep in the stack.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MatcherError {
    /// Returns the HTTP status code this error should be reported as over REST.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::IllegalDescriptor(_) | Self::IllegalJobDescriptor { .. } | Self::Validation(_) => 400,
            Self::NoMatch { .. } | Self::AgentDirectedMiss { .. } => 404,
            Self::CircuitBreakerOpen(_) | Self::Timeout(_) => 503,
            Self::StoreError(_)
            | Self::ExpressionEvalError(_)
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::IllegalDescriptor(_) => "ILLEGAL_DESCRIPTOR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::IllegalJobDescriptor { .. } => "ILLEGAL_JOB_DESCRIPTOR",
            Self::NoMatch { .. } => "NO_MATCH",
            Self::AgentDirectedMiss { .. } => "AGENT_DIRECTED_MISS",
            Self::StoreError(_) => "STORE_ERROR",
            Self::ExpressionEvalError(_) => "EXPRESSION_EVAL_ERROR",
            Self::CircuitBreakerOpen(_) => "CIRCUIT_BREAKER_OPEN",
            Self::Timeout(_) => "TIMEOUT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub fn illegal_descriptor<T: Into<String>>(message: T) -> Self {
        Self::IllegalDescriptor(message.into())
    }

    #[must_use]
    pub fn store_error<T: Into<String>>(message: T) -> Self {
        Self::StoreError(message.into())
    }

    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is safe to retry (idempotent reads against the
    /// job store, transport-level issues).
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::StoreError(_) | Self::CircuitBreakerOpen(_) | Self::Timeout(_)
        )
    }

    /// Checks if this error should count against a circuit breaker's failure
    /// threshold for the dependency it came from.
    #[must_use]
    pub const fn should_trip_circuit_breaker(&self) -> bool {
        matches!(self, Self::StoreError(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for MatcherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {err}"))
    }
}

/// Serializable error response for REST responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    #[must_use]
    pub fn from_error(error: &MatcherError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            trace_id: None,
        }
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&MatcherError> for ErrorResponse {
    fn from(error: &MatcherError) -> Self {
        Self::from_error(error)
    }
}
