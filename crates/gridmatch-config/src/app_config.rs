//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Job-store client configuration.
    #[serde(default)]
    pub job_store: JobStoreConfig,

    /// Matcher tuning (claim coordinator, site-mask refresh).
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Resilience-layer tuning (circuit breaker, retry, timeouts).
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "gridmatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// REST server host.
    pub rest_host: String,
    /// REST server port.
    pub rest_port: u16,
    /// gRPC server host.
    pub grpc_host: String,
    /// gRPC server port.
    pub grpc_port: u16,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_host: "0.0.0.0".to_string(),
            rest_port: 8080,
            grpc_host: "0.0.0.0".to_string(),
            grpc_port: 9090,
            request_timeout_secs: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the REST server address.
    #[must_use]
    pub fn rest_addr(&self) -> String {
        format!("{}:{}", self.rest_host, self.rest_port)
    }

    /// Returns the gRPC server address.
    #[must_use]
    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.grpc_host, self.grpc_port)
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration for the client that talks to the external, authoritative
/// job database and job-logging service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStoreConfig {
    /// gRPC endpoint of the remote job store (e.g. "http://job-db:50100").
    pub endpoint: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-call timeout in seconds, applied by the resilience layer.
    pub call_timeout_secs: u64,
    /// Connection pool size for the gRPC channel.
    pub pool_size: u32,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:50100".to_string(),
            connect_timeout_secs: 5,
            call_timeout_secs: 10,
            pool_size: 8,
        }
    }
}

impl JobStoreConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Matcher-specific tuning: how long the claim coordinator is willing to
/// wait for its exclusion lock, and how often the active site mask is
/// considered stale and re-fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Maximum time a single claim attempt may hold the exclusion lock
    /// before being treated as stuck.
    pub claim_lock_timeout_secs: u64,
    /// How long a previously fetched site mask may be reused before the
    /// matcher re-queries the job store.
    pub site_mask_ttl_secs: u64,
    /// Maximum number of task queues scanned per `requestJob` call before
    /// giving up and returning `NoMatch`. Protects against an unbounded
    /// job-store listing.
    pub max_queues_scanned: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            claim_lock_timeout_secs: 10,
            site_mask_ttl_secs: 60,
            max_queues_scanned: 10_000,
        }
    }
}

impl MatcherConfig {
    #[must_use]
    pub const fn claim_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.claim_lock_timeout_secs)
    }

    #[must_use]
    pub const fn site_mask_ttl(&self) -> Duration {
        Duration::from_secs(self.site_mask_ttl_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
    /// Enable metrics.
    pub metrics_enabled: bool,
    /// Metrics endpoint path.
    pub metrics_path: String,
    /// Enable request tracing.
    pub tracing_enabled: bool,

    // OpenTelemetry settings
    /// Service name for distributed tracing.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// OTLP endpoint URL (e.g., "http://localhost:4317").
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    /// Sampling ratio for traces (0.0 to 1.0).
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_service_name() -> String {
    "gridmatch".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            tracing_enabled: true,
            service_name: default_service_name(),
            otlp_endpoint: None,
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl ObservabilityConfig {
    /// Convert to `gridmatch_core::telemetry::TelemetryConfig`.
    #[must_use]
    pub fn to_telemetry_config(&self) -> gridmatch_core::telemetry::TelemetryConfig {
        gridmatch_core::telemetry::TelemetryConfig {
            enabled: self.tracing_enabled && self.otlp_endpoint.is_some(),
            service_name: self.service_name.clone(),
            otlp_endpoint: self.otlp_endpoint.clone(),
            sampling_ratio: self.sampling_ratio,
            console_output: self.log_format == "pretty",
        }
    }
}

/// Resilience-layer tuning: circuit breaker thresholds and retry policy for
/// every job-store call, mirroring `gridmatch_resilience`'s own config
/// types so the two stay in lockstep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u64,
    /// Consecutive successes required in half-open before the breaker closes.
    pub success_threshold: u64,
    /// How long the breaker stays open before allowing a half-open probe.
    pub breaker_reset_secs: u64,
    /// Requests allowed through while half-open.
    pub half_open_requests: u64,
    /// Retry attempts for idempotent read calls (site mask, queue listing,
    /// job lookups).
    pub read_retry_attempts: u32,
    /// Retry attempts for claim-writing calls. Kept low and predicate-gated
    /// at the call site — never retried after a logical rejection.
    pub write_retry_attempts: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Add jitter to backoff delays.
    pub jitter: bool,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            breaker_reset_secs: 30,
            half_open_requests: 3,
            read_retry_attempts: 3,
            write_retry_attempts: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ResilienceConfig {
    /// Converts to the circuit breaker's own configuration type.
    #[must_use]
    pub fn circuit_breaker_config(&self) -> gridmatch_resilience::circuit_breaker::CircuitBreakerConfig {
        gridmatch_resilience::circuit_breaker::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_secs(self.breaker_reset_secs),
            half_open_requests: self.half_open_requests,
        }
    }

    /// Retry policy for idempotent read calls.
    #[must_use]
    pub fn read_retry_policy(&self) -> gridmatch_resilience::retry::RetryPolicy {
        gridmatch_resilience::retry::RetryPolicy {
            max_attempts: self.read_retry_attempts,
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }

    /// Retry policy for claim-writing calls.
    #[must_use]
    pub fn write_retry_policy(&self) -> gridmatch_resilience::retry::RetryPolicy {
        gridmatch_resilience::retry::RetryPolicy {
            max_attempts: self.write_retry_attempts,
            ..self.read_retry_policy()
        }
    }
}
