//! HTTP retry helper for transient errors.
//!
//! All endpoint wrappers go through [`send`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! automatic retry with exponential backoff for transient failures
//! (timeouts, connection resets, HTTP 429, server errors).
//!
//! The `build_request` closure is called on each attempt to construct a
//! fresh [`reqwest::RequestBuilder`], since builders are consumed by
//! `.send()`. This allows retrying any request shape — GET, PUT with a
//! JSON body, DELETE.

use std::time::Duration;

use crate::ApiError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s) the total wait before giving
/// up is 14 seconds, which keeps a failing cycle well under the
/// analytics polling interval.
const MAX_RETRIES: u32 = 3;

/// Sends an HTTP request, retrying transient failures.
///
/// Does **not** retry 4xx responses: 401/403 surface immediately as
/// [`ApiError::Auth`] (a bad key never fixes itself mid-cycle) and the
/// rest as [`ApiError::Status`]. 429 and 5xx are retried.
///
/// # Errors
///
/// Returns [`ApiError`] if the request still fails after all retries or
/// the server returns a non-retryable status.
#[allow(clippy::future_not_send)]
pub async fn send<F>(build_request: F) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(ApiError::Auth { status });
                }
                let transient =
                    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if !transient || attempt >= MAX_RETRIES {
                    return Err(ApiError::Status {
                        status,
                        url: response.url().to_string(),
                    });
                }
                log::warn!(
                    "HTTP {status} from {} (attempt {}/{MAX_RETRIES}), retrying",
                    response.url(),
                    attempt + 1
                );
            }
            Err(err) => {
                let transient = err.is_connect() || err.is_timeout();
                if !transient || attempt >= MAX_RETRIES {
                    return Err(ApiError::Http(err));
                }
                log::warn!("request failed: {err} (attempt {}/{MAX_RETRIES}), retrying", attempt + 1);
            }
        }

        let backoff = Duration::from_secs(2_u64 << attempt);
        attempt += 1;
        tokio::time::sleep(backoff).await;
    }
}
