//! Fixed-delay retry policy for network calls.
//!
//! Only errors classified as transient are retried. When the attempts run
//! out, a transient failure escalates to [`PipelineError::ExternalTool`].
//! The policy also carries the per-attempt timeout handed to transports.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::RetrySettings;
use crate::error::{ExternalFailure, PipelineError};

/// Classifies errors the retry policy may try again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::TransientNetwork { .. })
    }
}

/// Bounded attempts with a fixed delay between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            timeout: RetrySettings::default().timeout(),
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.attempts, settings.wait()).with_timeout(settings.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Time one attempt may take before it counts as a transient failure.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut(u32) -> Result<T, PipelineError>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "retrying after {:?}",
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(PipelineError::TransientNetwork { reason, .. }) => {
                    return Err(PipelineError::external(
                        operation,
                        ExternalFailure::RetriesExhausted {
                            attempts: attempt,
                            reason,
                        },
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
