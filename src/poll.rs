//! Bounded polling against eventually-consistent backends.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Sleep before every fetch, including the first.
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut { attempts: u32, elapsed: Duration },
}

/// Repeatedly `fetch` until `ready` turns the fetched value into a result or
/// a bound is hit.
///
/// Errors from `fetch` end the loop immediately; only "not ready yet"
/// (`ready` returning `None`) is retried. A fetch still pending when the
/// deadline passes is dropped and counts as timed out. With neither bound set
/// this loops until `ready` accepts.
pub async fn poll_until<T, U, E, F, Fut, P>(
    options: &PollOptions,
    mut fetch: F,
    mut ready: P,
) -> Result<PollOutcome<U>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(T) -> Option<U>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        tokio::time::sleep(options.interval).await;
        attempts += 1;

        let value = match options.timeout {
            Some(limit) => {
                let remaining = limit.saturating_sub(started.elapsed());
                match tokio::time::timeout(remaining, fetch()).await {
                    Ok(value) => value?,
                    Err(_) => {
                        let elapsed = started.elapsed();
                        trace!(
                            attempts,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "fetch hit the deadline"
                        );
                        return Ok(PollOutcome::TimedOut { attempts, elapsed });
                    }
                }
            }
            None => fetch().await?,
        };

        if let Some(accepted) = ready(value) {
            trace!(attempts, "poll satisfied");
            return Ok(PollOutcome::Ready(accepted));
        }

        let elapsed = started.elapsed();
        trace!(attempts, elapsed_ms = elapsed.as_millis() as u64, "not ready yet");

        let out_of_attempts = options.max_attempts.is_some_and(|max| attempts >= max);
        let out_of_time = options.timeout.is_some_and(|limit| elapsed >= limit);
        if out_of_attempts || out_of_time {
            return Ok(PollOutcome::TimedOut { attempts, elapsed });
        }
    }
}
