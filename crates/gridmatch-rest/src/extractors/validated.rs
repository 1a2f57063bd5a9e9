//! Validated JSON extractor for automatic request validation.
//!
//! This module provides a `ValidatedJson<T>` extractor that deserializes JSON
//! and validates it using the `validator` crate. Validation errors are
//! returned as 422 Unprocessable Entity, reusing the same error envelope as
//! every other handler.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gridmatch_core::error::{ErrorResponse, MatcherError};
use gridmatch_core::validation::validation_errors_to_matcher_error;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// JSON extractor that automatically validates the deserialized value.
///
/// Returns 422 Unprocessable Entity if validation fails.
///
/// # Example
///
/// ```ignore
/// use gridmatch_rest::extractors::ValidatedJson;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct CheckForJobsRequest {
///     #[validate(length(min = 1))]
///     resource_jdl: String,
/// }
///
/// async fn check(ValidatedJson(request): ValidatedJson<CheckForJobsRequest>) {
///     // request is guaranteed to be valid here
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for ValidatedJson<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Rejection type for validated JSON extraction.
pub enum ValidatedJsonRejection {
    /// JSON parsing/deserialization error.
    JsonError(JsonRejection),
    /// Validation error, already folded into a `MatcherError`.
    ValidationError(ValidationErrors),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                let error =
                    MatcherError::Validation(format!("invalid JSON body: {rejection}"));
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::from_error(&error))).into_response()
            }
            Self::ValidationError(errors) => {
                let error = validation_errors_to_matcher_error(errors);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse::from_error(&error)),
                )
                    .into_response()
            }
        }
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct TestRequest {
        #[validate(length(min = 3, message = "name must be at least 3 characters"))]
        name: String,
    }

    #[test]
    fn test_invalid_request_yields_validation_error() {
        let req = TestRequest { name: "ab".to_string() };
        let result = req.validate();
        assert!(result.is_err());

        let error = validation_errors_to_matcher_error(result.unwrap_err());
        assert!(matches!(error, MatcherError::Validation(_)));
        assert!(error.to_string().contains("name"));
    }

    #[test]
    fn test_valid_request_passes() {
        let req = TestRequest {
            name: "Valid Name".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
