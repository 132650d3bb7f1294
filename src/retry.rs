// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

use std::future::Future;
use std::time::Duration;

use colored::Colorize;

use crate::error::Result;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Exponential backoff for transient API failures.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: INITIAL_RETRY_DELAY,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op`, repeating it while it fails with a retryable error.
    pub(crate) async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(ref e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max = self.max_retries,
                        "retrying after error: {}",
                        e.display_message()
                    );
                    eprintln!(
                        "{}",
                        format!(
                            "{} (retrying in {:.1}s, attempt {}/{})",
                            e.display_message(),
                            delay.as_secs_f32(),
                            attempt,
                            self.max_retries
                        )
                        .yellow()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Whether `url` answers at all. Any HTTP response counts as connected.
pub(crate) async fn check_connectivity(http: &reqwest::Client, url: &str) -> bool {
    match http.head(url).timeout(CONNECTIVITY_TIMEOUT).send().await {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("connectivity probe to {url} failed: {e}");
            false
        }
    }
}
