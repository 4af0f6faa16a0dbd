//! Error types and handling for tscache-core operations.
//!
//! This module provides a single error type that covers every failure in the
//! catalog refresh and profile import paths. Errors are categorized for easier
//! handling and carry a recoverability hint used by the retry logic.
//!
//! ## Error Categories
//!
//! - **Network Errors**: transport failures talking to the registry
//! - **Format Errors**: payloads that no longer match the expected shape
//! - **Lookup Errors**: unknown profile codes
//! - **Throttling**: rate limiting that outlasted the retry budget
//! - **Timeouts**: caller deadlines that expired mid-request
//! - **Configuration Errors**: invalid settings or config files
//!
//! ## Where errors surface
//!
//! The refresh loop logs failures and keeps serving the previous snapshot, so
//! none of these ever reach suggestion callers. The profile import path returns
//! them unchanged to the caller:
//!
//! ```rust
//! use tscache_core::Error;
//!
//! fn describe(err: &Error) -> &'static str {
//!     match err {
//!         Error::KeyNotFound(_) => "that profile code does not exist",
//!         Error::RateLimited { .. } => "the registry is throttling us, try later",
//!         Error::Timeout(_) => "the import took too long",
//!         Error::Format(_) => "the profile export is not in a format we understand",
//!         _ => "the registry request failed",
//!     }
//! }
//! # let _ = describe(&Error::Format("x".into()));
//! ```

use thiserror::Error;

/// The main error type for tscache-core operations.
///
/// All public functions in tscache-core return `Result<T, Error>`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Raised when a configuration file exists but cannot be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed before an HTTP status was available.
    ///
    /// Connection and timeout errors are recoverable; malformed requests are not.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream payload does not match the expected format.
    ///
    /// Raised for catalog bodies that do not deserialize, profile payloads
    /// missing the `#r2modman` marker, invalid base64 and unreadable archives.
    /// Never retried.
    #[error("Format error: {0}")]
    Format(String),

    /// The requested profile code is not known to the registry (HTTP 404).
    #[error("Not found: {0}")]
    KeyNotFound(String),

    /// The registry kept answering 429 until the retry budget ran out.
    #[error("Rate limited by the registry after {attempts} attempts")]
    RateLimited {
        /// Number of requests that were made.
        attempts: u32,
    },

    /// The registry answered with an HTTP status not otherwise classified.
    #[error("Registry request failed with status {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// A caller-supplied deadline expired.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Caller input was rejected before any work was done.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Format(format!("profile archive is unreadable: {err}"))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Format(format!("profile payload is not valid base64: {err}"))
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Returns `true` for connection problems, rate limiting, timeouts and
    /// server-side (5xx) failures. Lookup and format errors are permanent.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Transport { status, .. } => *status >= 500,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Format(_) => "format",
            Self::KeyNotFound(_) => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transport { .. } => "transport",
            Self::Timeout(_) => "timeout",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "config",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unwrap_used,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use base64::Engine;
    use proptest::prelude::*;
    use std::io;

    #[test]
    fn test_error_display_formatting() {
        let errors = vec![
            (Error::Format("bad marker".to_string()), "Format error"),
            (Error::KeyNotFound("abc".to_string()), "Not found"),
            (Error::Timeout("deadline".to_string()), "Timeout"),
            (Error::InvalidInput("empty".to_string()), "Invalid input"),
            (Error::Config("missing".to_string()), "Configuration error"),
        ];

        for (error, prefix) in errors {
            let rendered = error.to_string();
            assert!(rendered.starts_with(prefix), "{rendered} should start with {prefix}");
        }

        let limited = Error::RateLimited { attempts: 5 };
        assert!(limited.to_string().contains("after 5 attempts"));

        let transport = Error::Transport {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(transport.to_string().contains("502"));
        assert!(transport.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_error_categories() {
        let cases = vec![
            (Error::Io(io::Error::other("test")), "io"),
            (Error::Format("test".to_string()), "format"),
            (Error::KeyNotFound("test".to_string()), "not_found"),
            (Error::RateLimited { attempts: 1 }, "rate_limited"),
            (
                Error::Transport {
                    status: 400,
                    body: String::new(),
                },
                "transport",
            ),
            (Error::Timeout("test".to_string()), "timeout"),
            (Error::InvalidInput("test".to_string()), "invalid_input"),
            (Error::Config("test".to_string()), "config"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.category(), expected);
        }
    }

    #[test]
    fn test_error_recoverability() {
        let recoverable = vec![
            Error::RateLimited { attempts: 5 },
            Error::Timeout("slow".to_string()),
            Error::Transport {
                status: 503,
                body: String::new(),
            },
            Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")),
        ];
        let permanent = vec![
            Error::Format("bad".to_string()),
            Error::KeyNotFound("code".to_string()),
            Error::Transport {
                status: 400,
                body: String::new(),
            },
            Error::InvalidInput("empty".to_string()),
            Error::Config("bad".to_string()),
        ];

        for error in recoverable {
            assert!(error.is_recoverable(), "Expected {error:?} to be recoverable");
        }
        for error in permanent {
            assert!(!error.is_recoverable(), "Expected {error:?} to be permanent");
        }
    }

    #[test]
    fn test_base64_errors_become_format_errors() {
        let err = base64::engine::general_purpose::STANDARD
            .decode("!!not base64!!")
            .unwrap_err();
        let converted: Error = err.into();
        assert_eq!(converted.category(), "format");
        assert!(!converted.is_recoverable());
    }

    proptest! {
        #[test]
        fn test_format_error_with_arbitrary_messages(msg in r".{0,500}") {
            let error = Error::Format(msg.clone());
            let rendered = error.to_string();

            prop_assert!(rendered.contains(&msg));
            prop_assert_eq!(error.category(), "format");
            prop_assert!(!error.is_recoverable());
        }

        #[test]
        fn test_transport_recoverability_tracks_status(status in 400u16..600) {
            let error = Error::Transport { status, body: String::new() };
            prop_assert_eq!(error.is_recoverable(), status >= 500);
        }
    }
}
