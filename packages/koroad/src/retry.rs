//! Retry with exponential backoff and an end-to-end time budget.
//!
//! Every gateway call goes through [`send_with_retry`]. Transport failures
//! and HTTP 5xx are retried up to [`RetryPolicy::max_retries`] times; any
//! 4xx is permanent. The whole sequence, backoff sleeps included, is bounded
//! by [`RetryPolicy::max_duration`]. Dropping the returned future cancels
//! the in-flight request and any pending sleep.

use std::time::Duration;

use safewalk_koroad_models::Endpoint;

use crate::KoroadError;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Maximum length of the response body preview included in errors and logs.
const BODY_PREVIEW_LEN: usize = 200;

/// How a call retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Budget for the whole call, retries included.
    pub max_duration: Duration,
}

impl Default for RetryPolicy {
    /// Three retries at 1s, 2s, 4s within a 30 second budget.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(8),
            max_duration: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A single attempt bounded by `max_duration`.
    #[must_use]
    pub const fn none(max_duration: Duration) -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            max_duration,
        }
    }

    /// Total transport attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else if secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Sends `request` through `transport`, retrying per `policy`.
///
/// Returns the first 2xx response.
///
/// # Errors
///
/// * [`KoroadError::Rejected`] on any 4xx, without retrying
/// * [`KoroadError::RetriesExhausted`] when every attempt failed transiently
/// * [`KoroadError::Timeout`] when `policy.max_duration` elapses first
/// * [`KoroadError::InvalidRequest`] when the transport cannot build the
///   request
pub async fn send_with_retry<T: Transport + ?Sized>(
    transport: &T,
    endpoint: Endpoint,
    request: &TransportRequest,
    policy: &RetryPolicy,
) -> Result<TransportResponse, KoroadError> {
    tokio::time::timeout(
        policy.max_duration,
        send_inner(transport, endpoint, request, policy),
    )
    .await
    .unwrap_or_else(|_| {
        log::error!(
            "[{endpoint}] gave up after {:?} (timeout)",
            policy.max_duration
        );
        Err(KoroadError::Timeout {
            endpoint,
            timeout: policy.max_duration,
        })
    })
}

async fn send_inner<T: Transport + ?Sized>(
    transport: &T,
    endpoint: Endpoint,
    request: &TransportRequest,
    policy: &RetryPolicy,
) -> Result<TransportResponse, KoroadError> {
    let max_retries = policy.max_retries;
    let mut last_status = None;
    let mut last_message = String::new();

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("[{endpoint}]   retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match transport.get(request).await {
            Err(e) => {
                if !e.is_transient() {
                    return Err(KoroadError::InvalidRequest {
                        endpoint,
                        message: e.to_string(),
                    });
                }
                log::warn!("[{endpoint}]   transient error: {e}");
                last_status = None;
                last_message = e.to_string();
            }
            Ok(response) if response.is_server_error() => {
                log::warn!("[{endpoint}]   HTTP {} (server error)", response.status);
                last_status = Some(response.status);
                last_message = format!("HTTP {}: {}", response.status, preview(&response.body));
            }
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => {
                log::error!(
                    "[{endpoint}] HTTP {} (not retrying): {}",
                    response.status,
                    preview(&response.body)
                );
                return Err(KoroadError::Rejected {
                    endpoint,
                    status: response.status,
                    message: preview(&response.body),
                });
            }
        }
    }

    log::error!(
        "[{endpoint}] failed after {} attempts: {last_message}",
        policy.max_attempts()
    );
    Err(KoroadError::RetriesExhausted {
        endpoint,
        attempts: policy.max_attempts(),
        status: last_status,
        message: last_message,
    })
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_LEN {
        let head: String = body.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
