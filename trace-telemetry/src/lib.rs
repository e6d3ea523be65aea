//! Observability utilities for the context graph service.

#![warn(missing_docs, clippy::pedantic)]

pub mod tracing_support {
    //! Structured tracing setup.

    use std::fmt;
    use std::str::FromStr;

    use thiserror::Error;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt as fmt_layer};

    /// Errors raised while installing the subscriber.
    #[derive(Debug, Error)]
    pub enum TelemetryError {
        /// The log level or filter directive did not parse.
        #[error("invalid log filter `{filter}`: {reason}")]
        InvalidFilter {
            /// The rejected directive.
            filter: String,
            /// Parser message.
            reason: String,
        },
        /// The log format is not supported.
        #[error("unknown log format `{0}` (expected `pretty` or `json`)")]
        UnknownFormat(String),
        /// A global subscriber was already installed.
        #[error("tracing subscriber already initialised: {0}")]
        AlreadyInitialised(String),
    }

    /// Result alias for telemetry setup.
    pub type TelemetryResult<T> = Result<T, TelemetryError>;

    /// Output format of log lines.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum LogFormat {
        /// Human-readable lines.
        #[default]
        Pretty,
        /// One JSON object per line.
        Json,
    }

    impl FromStr for LogFormat {
        type Err = TelemetryError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "pretty" | "text" => Ok(Self::Pretty),
                "json" => Ok(Self::Json),
                other => Err(TelemetryError::UnknownFormat(other.to_owned())),
            }
        }
    }

    impl fmt::Display for LogFormat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Pretty => "pretty",
                Self::Json => "json",
            })
        }
    }

    /// Builds the filter: `RUST_LOG` when set, otherwise `level` applied to
    /// every crate.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] when `level` is not a valid
    /// directive.
    pub fn build_filter(level: &str) -> TelemetryResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(level).map_err(|err| TelemetryError::InvalidFilter {
            filter: level.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Installs the global tracing subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid filter or when a subscriber is already
    /// installed.
    pub fn init_tracing(level: &str, format: LogFormat) -> TelemetryResult<()> {
        let filter = build_filter(level)?;
        let registry = tracing_subscriber::registry().with(filter);
        let result = match format {
            LogFormat::Pretty => registry.with(fmt_layer::layer().with_target(true)).try_init(),
            LogFormat::Json => registry
                .with(fmt_layer::layer().json().with_current_span(false))
                .try_init(),
        };
        result.map_err(|err| TelemetryError::AlreadyInitialised(err.to_string()))
    }

}

pub mod health {
    //! Health reporting payloads.

    use serde::Serialize;

    /// Service identity returned by the root endpoint.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ServiceInfo {
        /// Always `ok` while the process serves requests.
        pub status: &'static str,
        /// Service name.
        pub service: &'static str,
        /// Service version.
        pub version: &'static str,
    }

    impl ServiceInfo {
        /// Describes a running service.
        #[must_use]
        pub const fn new(service: &'static str, version: &'static str) -> Self {
            Self {
                status: "ok",
                service,
                version,
            }
        }
    }

    /// Liveness payload.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct HealthStatus {
        /// `healthy` while the process serves requests.
        pub status: &'static str,
    }

    impl HealthStatus {
        /// The healthy status.
        #[must_use]
        pub const fn healthy() -> Self {
            Self { status: "healthy" }
        }
    }

}

pub use health::{HealthStatus, ServiceInfo};
pub use tracing_support::{LogFormat, TelemetryError, TelemetryResult, init_tracing};
