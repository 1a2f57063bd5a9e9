//! Configuration validation module.
//!
//! Provides validation for configuration values that can't be expressed as
//! plain serde defaults, failing fast at startup rather than at runtime.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// REST and gRPC ports conflict.
    PortConflict { rest: u16, grpc: u16 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Sampling ratio must be between 0.0 and 1.0.
    InvalidSamplingRatio { value: f64 },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// `max_queues_scanned` must be positive, or nothing would ever match.
    NonPositiveQueueBound,
    /// A resilience threshold or attempt count must be positive.
    NonPositiveResilienceBound { name: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {name}: {value} (must be 1-65535)")
            }
            Self::PortConflict { rest, grpc } => {
                write!(f, "REST port ({rest}) and gRPC port ({grpc}) cannot be the same")
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {value} exceeds maximum allowed ({maximum})")
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {url_type} URL: {message}")
            }
            Self::InvalidSamplingRatio { value } => {
                write!(f, "Invalid sampling ratio: {value} (must be between 0.0 and 1.0)")
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{name}' must be positive, got {value}")
            }
            Self::InvalidLogLevel { value } => {
                write!(f, "Invalid log level: '{value}' (valid: trace, debug, info, warn, error)")
            }
            Self::NonPositiveQueueBound => {
                write!(f, "matcher.max_queues_scanned must be positive")
            }
            Self::NonPositiveResilienceBound { name } => {
                write!(f, "resilience.{name} must be positive")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_server(&config.server, &mut result);
        Self::validate_job_store(&config.job_store, &mut result);
        Self::validate_matcher(&config.matcher, &mut result);
        Self::validate_observability(&config.observability, &mut result);
        Self::validate_resilience(&config.resilience, &mut result);

        result.into_result()
    }

    fn validate_server(config: &crate::ServerConfig, result: &mut ValidationResult) {
        if config.rest_port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "rest_port".to_string(),
                value: config.rest_port,
            });
        }
        if config.grpc_port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "grpc_port".to_string(),
                value: config.grpc_port,
            });
        }

        if config.rest_host == config.grpc_host && config.rest_port == config.grpc_port {
            result.add_error(ConfigValidationError::PortConflict {
                rest: config.rest_port,
                grpc: config.grpc_port,
            });
        }

        if config.request_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "request_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_job_store(config: &crate::JobStoreConfig, result: &mut ValidationResult) {
        if Url::parse(&config.endpoint).is_err() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "job_store.endpoint".to_string(),
                message: format!("Invalid URL format: {}", config.endpoint),
            });
        }

        if config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "job_store.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
        if config.call_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "job_store.call_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_matcher(config: &crate::MatcherConfig, result: &mut ValidationResult) {
        if config.claim_lock_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "matcher.claim_lock_timeout_secs".to_string(),
                value: 0,
            });
        }
        if config.max_queues_scanned == 0 {
            result.add_error(ConfigValidationError::NonPositiveQueueBound);
        }
    }

    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        if !(0.0..=1.0).contains(&config.sampling_ratio) {
            result.add_error(ConfigValidationError::InvalidSamplingRatio {
                value: config.sampling_ratio,
            });
        }

        if let Some(ref endpoint) = config.otlp_endpoint {
            if Url::parse(endpoint).is_err() {
                result.add_error(ConfigValidationError::InvalidUrl {
                    url_type: "otlp_endpoint".to_string(),
                    message: format!("Invalid URL format: {endpoint}"),
                });
            }
        }
    }

    fn validate_resilience(config: &crate::ResilienceConfig, result: &mut ValidationResult) {
        if config.failure_threshold == 0 {
            result.add_error(ConfigValidationError::NonPositiveResilienceBound {
                name: "failure_threshold".to_string(),
            });
        }
        if config.success_threshold == 0 {
            result.add_error(ConfigValidationError::NonPositiveResilienceBound {
                name: "success_threshold".to_string(),
            });
        }
        if config.breaker_reset_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveResilienceBound {
                name: "breaker_reset_secs".to_string(),
            });
        }
        if config.read_retry_attempts == 0 {
            result.add_error(ConfigValidationError::NonPositiveResilienceBound {
                name: "read_retry_attempts".to_string(),
            });
        }
        if config.write_retry_attempts == 0 {
            result.add_error(ConfigValidationError::NonPositiveResilienceBound {
                name: "write_retry_attempts".to_string(),
            });
        }
    }
}

/// Formats validation errors for display.
#[must_use]
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {error}\n", i + 1));
    }
    output
}
