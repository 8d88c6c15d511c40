//! Timeouts, a single retry for transient failures, and send pacing.

use std::future::Future;
use std::time::Duration;

use eyre::{Result, eyre};
use tokio::time::{Instant, sleep_until, timeout};
use tracing::warn;

use crate::messenger::MessagingError;

/// Runs a gateway call with a deadline, retrying once when the first attempt
/// fails transiently.
pub async fn send_with_retry<F, Fut>(limit: Duration, mut call: F) -> Result<(), MessagingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), MessagingError>>,
{
    match bounded_send(limit, call()).await {
        Err(error) if error.is_transient() => {
            warn!(%error, "Transient messaging failure, retrying once");
            bounded_send(limit, call()).await
        }
        outcome => outcome,
    }
}

async fn bounded_send<Fut>(limit: Duration, call: Fut) -> Result<(), MessagingError>
where
    Fut: Future<Output = Result<(), MessagingError>>,
{
    timeout(limit, call)
        .await
        .unwrap_or(Err(MessagingError::Timeout))
}

/// Store read with a deadline and one retry.
pub async fn read_with_retry<T, F, Fut>(limit: Duration, what: &str, mut query: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match bounded(limit, what, query()).await {
        Ok(value) => Ok(value),
        Err(error) => {
            warn!(error = %error, what, "Store read failed, retrying once");
            bounded(limit, what, query()).await
        }
    }
}

/// Store call with a deadline and no retry.
pub async fn bounded<T, Fut>(limit: Duration, what: &str, call: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    timeout(limit, call)
        .await
        .map_err(|_| eyre!("{} timed out after {:?}", what, limit))?
}

/// Keeps consecutive sends at least `spacing` apart.
#[derive(Debug)]
pub struct Pacer {
    spacing: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last: None,
        }
    }

    /// Waits until the next send is allowed and claims the slot.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            sleep_until(last + self.spacing).await;
        }
        self.last = Some(Instant::now());
    }
}
