//! Construction-time configuration for [`BrokerMetrics`].
//!
//! Everything here is fixed once the aggregator is built.
//!
//! ```rust
//! use std::time::Duration;
//! use kmetrics::config::{HandlerOptions, MetricsConfig};
//! use kmetrics::metrics::BrokerMetrics;
//!
//! let config = MetricsConfig::default()
//!     .with_process_collector(true)
//!     .with_handler_options(HandlerOptions {
//!         timeout: Some(Duration::from_secs(5)),
//!         max_requests_in_flight: 4,
//!         ..Default::default()
//!     });
//! let metrics = BrokerMetrics::with_config("kafka", config).unwrap();
//! # let _ = metrics;
//! ```
//!
//! [`BrokerMetrics`]: crate::metrics::BrokerMetrics

use std::time::Duration;

use prometheus::Registry;

use crate::error::{Error, Result};

/// What the scrape handler does when encoding fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Respond with HTTP 500 and the error text.
    #[default]
    HttpError,
    /// Log the error and serve whatever was encoded.
    ContinueOnError,
}

impl std::str::FromStr for ErrorHandling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http_error" | "http" => Ok(ErrorHandling::HttpError),
            "continue" | "continue_on_error" => Ok(ErrorHandling::ContinueOnError),
            other => Err(Error::Config(format!(
                "unknown scrape error handling mode: {other:?}"
            ))),
        }
    }
}

/// Options for the scrape handler returned by `BrokerMetrics::handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandlerOptions {
    pub error_handling: ErrorHandling,
    /// Upper bound on gathering and encoding. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Concurrent scrapes allowed before answering 503. `0` means unlimited.
    pub max_requests_in_flight: usize,
}

/// Aggregator configuration.
#[derive(Clone, Default)]
pub struct MetricsConfig {
    /// Registry to publish into. A fresh private registry when `None`.
    pub registry: Option<Registry>,
    /// Also register the process collector (CPU, memory, fds).
    pub process_collector: bool,
    pub handler: HandlerOptions,
}

impl std::fmt::Debug for MetricsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("registry", &self.registry.as_ref().map(|_| "<custom>"))
            .field("process_collector", &self.process_collector)
            .field("handler", &self.handler)
            .finish()
    }
}

impl MetricsConfig {
    /// Publish into an existing registry instead of a private one.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_process_collector(mut self, enabled: bool) -> Self {
        self.process_collector = enabled;
        self
    }

    pub fn with_handler_options(mut self, handler: HandlerOptions) -> Self {
        self.handler = handler;
        self
    }

    /// Validate the configuration and return any errors found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.handler.timeout == Some(Duration::ZERO) {
            errors.push("scrape timeout must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `METRICS_PROCESS_COLLECTOR`: "true" or "false" (default: false)
    /// - `METRICS_SCRAPE_TIMEOUT_MS`: scrape timeout in milliseconds (default: none)
    /// - `METRICS_MAX_SCRAPES_IN_FLIGHT`: concurrent scrape limit (default: 0, unlimited)
    /// - `METRICS_SCRAPE_ERROR_HANDLING`: "http_error" or "continue" (default: http_error)
    ///
    /// The registry is always a fresh private one; use [`with_registry`] to
    /// share one.
    ///
    /// [`with_registry`]: MetricsConfig::with_registry
    pub fn from_env() -> Result<Self> {
        let process_collector = match std::env::var("METRICS_PROCESS_COLLECTOR") {
            Ok(v) => v
                .parse::<bool>()
                .map_err(|e| Error::Config(format!("Invalid METRICS_PROCESS_COLLECTOR: {}", e)))?,
            Err(_) => false,
        };

        let timeout = match std::env::var("METRICS_SCRAPE_TIMEOUT_MS") {
            Ok(v) => Some(Duration::from_millis(v.parse().map_err(|e| {
                Error::Config(format!("Invalid METRICS_SCRAPE_TIMEOUT_MS: {}", e))
            })?)),
            Err(_) => None,
        };

        let max_requests_in_flight = match std::env::var("METRICS_MAX_SCRAPES_IN_FLIGHT") {
            Ok(v) => v.parse().map_err(|e| {
                Error::Config(format!("Invalid METRICS_MAX_SCRAPES_IN_FLIGHT: {}", e))
            })?,
            Err(_) => 0,
        };

        let error_handling = match std::env::var("METRICS_SCRAPE_ERROR_HANDLING") {
            Ok(v) => v.parse()?,
            Err(_) => ErrorHandling::default(),
        };

        let config = Self {
            registry: None,
            process_collector,
            handler: HandlerOptions {
                error_handling,
                timeout,
                max_requests_in_flight,
            },
        };

        config
            .validate()
            .map_err(|errors| Error::Config(errors.join("; ")))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MetricsConfig::default();
        assert!(config.registry.is_none());
        assert!(!config.process_collector);
        assert_eq!(config.handler.error_handling, ErrorHandling::HttpError);
        assert_eq!(config.handler.timeout, None);
        assert_eq!(config.handler.max_requests_in_flight, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let registry = Registry::new();
        let config = MetricsConfig::default()
            .with_registry(registry)
            .with_process_collector(true)
            .with_handler_options(HandlerOptions {
                error_handling: ErrorHandling::ContinueOnError,
                timeout: Some(Duration::from_millis(250)),
                max_requests_in_flight: 2,
            });

        assert!(config.registry.is_some());
        assert!(config.process_collector);
        assert_eq!(config.handler.max_requests_in_flight, 2);
        assert_eq!(config.handler.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let config = MetricsConfig::default().with_handler_options(HandlerOptions {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        });
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("timeout"));
    }

    #[test]
    fn test_error_handling_from_str() {
        assert_eq!(
            "http_error".parse::<ErrorHandling>().unwrap(),
            ErrorHandling::HttpError
        );
        assert_eq!(
            "CONTINUE".parse::<ErrorHandling>().unwrap(),
            ErrorHandling::ContinueOnError
        );
        assert!("panic".parse::<ErrorHandling>().is_err());
    }

    #[test]
    fn test_debug_hides_registry_internals() {
        let config = MetricsConfig::default().with_registry(Registry::new());
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("MetricsConfig"));
        assert!(debug_str.contains("<custom>"));
    }
}
