//! Pieces shared by the HTTP-backed providers: error mapping and the
//! retry loop.

use reqwest::Response;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::AIError;

/// Maps a transport failure to an `AIError`.
pub(crate) fn map_send_error(err: reqwest::Error, timeout: Duration) -> AIError {
    if err.is_timeout() {
        AIError::timed_out(timeout)
    } else if err.is_connect() {
        AIError::network(format!("Connection failed: {}", err))
    } else {
        AIError::network(err.to_string())
    }
}

/// Passes successful responses through and classifies the rest.
pub(crate) async fn check_status(
    response: Response,
    default_retry_after: u32,
) -> Result<Response, AIError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &body, default_retry_after))
}

pub(crate) fn classify_status(status: u16, body: &str, default_retry_after: u32) -> AIError {
    match status {
        401 | 403 => AIError::AuthenticationFailed,
        429 => AIError::rate_limited(parse_retry_after(body).unwrap_or(default_retry_after)),
        400 | 404 | 422 => AIError::InvalidRequest(body.to_string()),
        500..=599 => AIError::unavailable(format!("Server error {}: {}", status, body)),
        _ => AIError::network(format!("Unexpected status {}: {}", status, body)),
    }
}

/// Pulls "try again in Ns" out of a provider error body.
pub(crate) fn parse_retry_after(body: &str) -> Option<u32> {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let message = parsed.get("error")?.get("message")?.as_str()?;
    let rest = &message[message.find("try again in ")? + "try again in ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Runs `attempt` until it succeeds, fails permanently, or retries run out.
///
/// Backoff doubles from `base_delay` on each retry.
pub(crate) async fn with_retries<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    mut attempt: F,
) -> Result<T, AIError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AIError>>,
{
    let mut retry_count = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry_count < max_retries => {
                let delay = base_delay * 2u32.pow(retry_count);
                tracing::debug!(error = %err, retry = retry_count + 1, ?delay, "retrying completion");
                sleep(delay).await;
                retry_count += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn classifies_common_statuses() {
        assert!(matches!(classify_status(401, "", 30), AIError::AuthenticationFailed));
        assert!(matches!(
            classify_status(429, "", 30),
            AIError::RateLimited { retry_after_secs: 30 }
        ));
        assert!(matches!(classify_status(400, "bad", 30), AIError::InvalidRequest(_)));
        assert!(matches!(classify_status(503, "", 30), AIError::Unavailable { .. }));
    }

    #[test]
    fn retry_after_is_read_from_message() {
        let body = r#"{"error": {"message": "Rate limit reached. Please try again in 7s."}}"#;
        assert_eq!(parse_retry_after(body), Some(7));
        assert_eq!(parse_retry_after("not json"), None);
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_retries(3, Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AIError::unavailable("busy"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(3, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AIError::AuthenticationFailed) }
        })
        .await;

        assert!(matches!(result, Err(AIError::AuthenticationFailed)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AIError::network("reset")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
