// Retry with exponential backoff for transient Ollama failures
//
// The local server refuses connections briefly while it loads a model
// into memory, so a couple of spaced retries are usually enough.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 2000;

pub async fn with_retry<F, Fut, T>(f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_ATTEMPTS {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = Some(e);
                if attempt < MAX_ATTEMPTS - 1 {
                    let delay = Duration::from_millis(BASE_DELAY_MS << attempt);
                    tracing::warn!(
                        "ollama request failed (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        MAX_ATTEMPTS,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    // last_error is always set after a failed loop
    Err(last_error.unwrap())
}
