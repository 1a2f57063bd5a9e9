//! Result type aliases used across the matcher workspace.

use crate::MatcherError;

/// A specialized `Result` type for matcher operations.
pub type MatcherResult<T> = Result<T, MatcherError>;

/// A boxed future returning a `MatcherResult`.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = MatcherResult<T>> + Send + 'a>>;
