//! Error types for HTTP client operations.
//!
//! This module defines the [`HttpError`] enum which encompasses all possible
//! failure modes when talking to a toncenter-compatible HTTP API.

use thiserror::Error;

/// Errors that can occur during HTTP client operations.
///
/// # Error Categories
///
/// - **Network errors**: [`RequestFailed`](HttpError::RequestFailed),
///   [`MiddlewareError`](HttpError::MiddlewareError). Terminal, never retried.
/// - **Rate limiting**: [`RateLimited`](HttpError::RateLimited). Returned only
///   after the back-off budget is spent; the caller decides whether to try again.
/// - **Server errors**: [`ServerError`](HttpError::ServerError) for any other
///   non-2xx status, [`RemoteRejected`](HttpError::RemoteRejected) when the API
///   answered `ok: false`.
/// - **Client errors**: [`UrlError`](HttpError::UrlError),
///   [`UnsupportedMethod`](HttpError::UnsupportedMethod),
///   [`JsonError`](HttpError::JsonError)
///
/// # Example
///
/// ```rust,no_run
/// use tonsend::http::HttpError;
///
/// fn handle_error(err: HttpError) {
///     match err {
///         HttpError::RateLimited { attempts } => {
///             eprintln!("Still rate limited after {} attempts", attempts);
///         }
///         HttpError::ServerError { status, body } => {
///             eprintln!("Server returned {}: {}", status, body);
///         }
///         _ => eprintln!("Other error: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum HttpError {
    /// The HTTP request failed due to a network or connection error.
    ///
    /// This covers connection refused, DNS resolution failure, TLS errors and
    /// the per-request timeout.
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// An error occurred in the HTTP middleware layer.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// The server kept answering `429 Too Many Requests` until the retry
    /// budget was exhausted.
    #[error("Rate limited: still receiving 429 after {attempts} attempts")]
    RateLimited {
        /// Total number of requests sent, including the first one.
        attempts: u32,
    },

    /// The server returned a non-success HTTP status code other than 429.
    #[error("Server error {status}: {body}")]
    ServerError {
        /// The HTTP status code returned by the server.
        status: reqwest::StatusCode,
        /// The response body, which may contain error details.
        body: String,
    },

    /// The API answered with `ok: false`.
    #[error("Remote service rejected the request: {0}")]
    RemoteRejected(String),

    /// The API answered `ok: true` without a `result` field.
    #[error("Response is missing the result field")]
    MissingResult,

    /// A numeric field arrived as a string that does not parse.
    #[error("Invalid numeric field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// Failed to parse or construct a URL.
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// Only `GET` and `POST` are supported.
    #[error("Unsupported HTTP method")]
    UnsupportedMethod,

    /// Failed to serialize the request or deserialize the response.
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}
