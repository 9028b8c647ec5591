use shared::errors::ServiceError;
use std::future::Future;
use std::time::Duration;

const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::Transport(e.to_string()))
}

pub fn transport_error(err: reqwest::Error, timeout: Duration) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout {
            secs: timeout.as_secs(),
        }
    } else if err.is_decode() {
        ServiceError::MalformedResponse(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}

/// Run `op` until it succeeds, fails permanently, or `max_retries` extra
/// attempts have been spent. Backoff doubles from 500ms up to 8s.
pub async fn with_retries<T, F, Fut>(service: &str, max_retries: u32, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_retries => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    service,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}
