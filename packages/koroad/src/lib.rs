#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the Koroad open traffic-accident data service.
//!
//! [`KoroadGateway`] owns the transport and the retry policy, builds one
//! query per resource, and hands each raw envelope to the [`normalize`]
//! functions. Failures of the call itself (transport errors, 5xx after the
//! retry budget, 4xx) surface as [`KoroadError`]. Provider-level "no data"
//! answers surface as empty results.

pub mod config;
pub mod gateway;
pub mod normalize;
pub mod retry;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use safewalk_koroad_models::{Endpoint, InvalidCriteriaError};

pub use config::KoroadConfig;
pub use gateway::{KoroadApi, KoroadGateway};
pub use retry::RetryPolicy;
pub use transport::{ReqwestTransport, Transport, TransportError};

/// Number of leading key characters kept by [`mask_api_key`].
const VISIBLE_KEY_PREFIX: usize = 8;

/// Errors that can occur while talking to the provider.
#[derive(Debug, thiserror::Error)]
pub enum KoroadError {
    /// Transient failures persisted through every allowed attempt.
    #[error("[{endpoint}] request failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Resource that was being fetched.
        endpoint: Endpoint,
        /// Transport attempts made, including the first.
        attempts: u32,
        /// HTTP status of the last attempt, if one was received.
        status: Option<u16>,
        /// Description of the last failure.
        message: String,
    },

    /// The provider rejected the request with a 4xx status.
    #[error("[{endpoint}] request rejected with HTTP {status}: {message}")]
    Rejected {
        /// Resource that was being fetched.
        endpoint: Endpoint,
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The call, including retries, exceeded its time budget.
    #[error("[{endpoint}] request timed out after {timeout:?}")]
    Timeout {
        /// Resource that was being fetched.
        endpoint: Endpoint,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// The transport refused to send the request at all.
    #[error("[{endpoint}] request could not be sent: {message}")]
    InvalidRequest {
        /// Resource that was being fetched.
        endpoint: Endpoint,
        /// Description of what went wrong.
        message: String,
    },

    /// Query parameters failed validation before any request was sent.
    #[error("Invalid search criteria: {0}")]
    InvalidCriteria(#[from] InvalidCriteriaError),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error (config file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl KoroadError {
    /// Resource the failed call targeted, if the failure came from a call.
    #[must_use]
    pub const fn endpoint(&self) -> Option<Endpoint> {
        match self {
            Self::RetriesExhausted { endpoint, .. }
            | Self::Rejected { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::InvalidRequest { endpoint, .. } => Some(*endpoint),
            Self::InvalidCriteria(_) | Self::Config { .. } | Self::Io(_) | Self::Toml(_) => None,
        }
    }

    /// HTTP status carried by the failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RetriesExhausted { status, .. } => *status,
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Renders a credential for logs: the first 8 characters followed by `****`.
///
/// Keys of 8 characters or fewer are fully masked.
#[must_use]
pub fn mask_api_key(api_key: &str) -> String {
    if api_key.chars().count() <= VISIBLE_KEY_PREFIX {
        return "****".to_string();
    }
    let prefix: String = api_key.chars().take(VISIBLE_KEY_PREFIX).collect();
    format!("{prefix}****")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_prefix() {
        assert_eq!(mask_api_key("ABCDEFGH12345678"), "ABCDEFGH****");
        assert_eq!(mask_api_key("ABCDEFGH"), "****");
        assert_eq!(mask_api_key(""), "****");
    }

    #[test]
    fn error_exposes_endpoint_and_status() {
        let err = KoroadError::Rejected {
            endpoint: Endpoint::AccidentStatistics,
            status: 400,
            message: "bad request".to_string(),
        };
        assert_eq!(err.endpoint(), Some(Endpoint::AccidentStatistics));
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("accident_statistics"));

        let err = KoroadError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.endpoint(), None);
        assert_eq!(err.status(), None);
    }
}
