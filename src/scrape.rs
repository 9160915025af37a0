//! Prometheus scrape handler.
//!
//! A [`ScrapeHandler`] is bound to one registry and one set of
//! [`HandlerOptions`]. Each call to [`ScrapeHandler::serve`] gathers the
//! registry, encodes it in the text exposition format and wraps the result
//! in a [`ScrapeResponse`], which an HTTP layer can send as-is.
//!
//! Limits from the options are applied per call:
//! - `max_requests_in_flight`: excess scrapes get 503 immediately
//! - `timeout`: scrapes that take longer get 503
//! - `error_handling`: encoding failures become 500 or a partial body

use std::sync::Arc;

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::config::{ErrorHandling, HandlerOptions};
use crate::constants::TEXT_CONTENT_TYPE;
use crate::error::{Error, Result};

/// A rendered scrape, ready to be written to an HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ScrapeResponse {
    fn ok(body: String) -> Self {
        Self {
            status: 200,
            content_type: TEXT_CONTENT_TYPE,
            body,
        }
    }

    fn unavailable(body: String) -> Self {
        Self {
            status: 503,
            content_type: "text/plain",
            body,
        }
    }

    fn internal_error(body: String) -> Self {
        Self {
            status: 500,
            content_type: "text/plain",
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// HTTP status text for this response.
    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }

    /// Render as a complete HTTP/1.1 response.
    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            self.status_text(),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

/// Serves the current state of a registry.
///
/// Cheap to clone; clones share the in-flight limit.
#[derive(Clone)]
pub struct ScrapeHandler {
    registry: Registry,
    options: HandlerOptions,
    in_flight: Option<Arc<Semaphore>>,
}

impl ScrapeHandler {
    pub fn new(registry: Registry, options: HandlerOptions) -> Self {
        let in_flight = (options.max_requests_in_flight > 0)
            .then(|| Arc::new(Semaphore::new(options.max_requests_in_flight)));
        Self {
            registry,
            options,
            in_flight,
        }
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode the registry, ignoring limits and error handling mode.
    pub fn encode(&self) -> Result<String> {
        encode_text(&self.registry)
    }

    /// Handle one scrape.
    pub async fn serve(&self) -> ScrapeResponse {
        let permit = match &self.in_flight {
            Some(semaphore) => match semaphore.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(
                        limit = self.options.max_requests_in_flight,
                        "Rejecting scrape, too many in flight"
                    );
                    return ScrapeResponse::unavailable(format!(
                        "Limit of concurrent requests reached ({}), try again later.\n",
                        self.options.max_requests_in_flight
                    ));
                }
            },
            None => None,
        };

        let registry = self.registry.clone();
        // The permit is held until the gather finishes, even after a timeout.
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            registry.gather()
        });

        let joined = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout = ?limit, "Scrape timed out");
                    return ScrapeResponse::unavailable(format!(
                        "Exceeded configured timeout of {:?}.\n",
                        limit
                    ));
                }
            },
            None => task.await,
        };

        match joined {
            Ok(families) => render(&families, self.options.error_handling),
            Err(e) => {
                error!(error = %e, "Gathering metrics failed");
                ScrapeResponse::internal_error(format!(
                    "An error has occurred while serving metrics:\n\n{}\n",
                    e
                ))
            }
        }
    }
}

/// Encode a whole registry in text format.
pub fn encode_text(registry: &Registry) -> Result<String> {
    let (buffer, result) = encode_families(&registry.gather());
    result?;
    String::from_utf8(buffer).map_err(|e| Error::Encode(e.to_string()))
}

/// Encode gathered families, keeping whatever was written before a failure.
fn encode_families(families: &[MetricFamily]) -> (Vec<u8>, Result<()>) {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    let result = encoder
        .encode(families, &mut buffer)
        .map_err(|e| Error::Encode(e.to_string()));
    (buffer, result)
}

/// Turn gathered families into a response according to `mode`.
fn render(families: &[MetricFamily], mode: ErrorHandling) -> ScrapeResponse {
    let (buffer, result) = encode_families(families);
    let body = String::from_utf8_lossy(&buffer).into_owned();

    match (result, mode) {
        (Ok(()), _) => ScrapeResponse::ok(body),
        (Err(e), ErrorHandling::HttpError) => {
            error!(error = %e, "Failed to encode metrics");
            ScrapeResponse::internal_error(format!(
                "An error has occurred while serving metrics:\n\n{}\n",
                e
            ))
        }
        (Err(e), ErrorHandling::ContinueOnError) => {
            warn!(error = %e, "Failed to encode some metrics, serving partial output");
            ScrapeResponse::ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::{Collector, Desc};
    use prometheus::{IntCounter, IntCounterVec, Opts};
    use std::time::Duration;

    /// Collector that blocks in `collect` to simulate a slow registry.
    struct SlowCollector {
        inner: IntCounter,
        delay: Duration,
    }

    impl Collector for SlowCollector {
        fn desc(&self) -> Vec<&Desc> {
            self.inner.desc()
        }

        fn collect(&self) -> Vec<MetricFamily> {
            std::thread::sleep(self.delay);
            self.inner.collect()
        }
    }

    fn slow_registry(delay: Duration) -> Registry {
        let registry = Registry::new();
        let inner = IntCounter::new("slow_total", "Slow").unwrap();
        inner.inc();
        registry
            .register(Box::new(SlowCollector { inner, delay }))
            .unwrap();
        registry
    }

    fn good_family() -> MetricFamily {
        let counter = IntCounterVec::new(Opts::new("good_total", "Good"), &["node_id"]).unwrap();
        counter.with_label_values(&["1"]).inc();
        counter.collect().remove(0)
    }

    #[test]
    fn test_response_to_http() {
        let response = ScrapeResponse::ok("a 1\n".to_string());
        let http = response.to_http();
        assert!(http.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(http.contains("Content-Type: text/plain; version=0.0.4; charset=utf-8"));
        assert!(http.contains("Content-Length: 4\r\n"));
        assert!(http.ends_with("\r\n\r\na 1\n"));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ScrapeResponse::unavailable(String::new()).status_text(), "Service Unavailable");
        assert_eq!(
            ScrapeResponse::internal_error(String::new()).status_text(),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_render_http_error_mode() {
        // A family without a name is rejected by the text encoder.
        let families = vec![good_family(), MetricFamily::default()];
        let response = render(&families, ErrorHandling::HttpError);
        assert_eq!(response.status, 500);
        assert!(response.body.contains("An error has occurred"));
    }

    #[test]
    fn test_render_continue_mode_keeps_partial_output() {
        let families = vec![good_family(), MetricFamily::default()];
        let response = render(&families, ErrorHandling::ContinueOnError);
        assert_eq!(response.status, 200);
        assert!(response.body.contains(r#"good_total{node_id="1"} 1"#));
    }

    #[test]
    fn test_encode_text_empty_registry() {
        assert_eq!(encode_text(&Registry::new()).unwrap(), "");
    }

    #[tokio::test]
    async fn test_serve_ok() {
        let registry = Registry::new();
        let counter = IntCounter::new("hits_total", "Hits").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc_by(3);

        let handler = ScrapeHandler::new(registry, HandlerOptions::default());
        let response = handler.serve().await;
        assert!(response.is_success());
        assert!(response.body.contains("hits_total 3"));
        assert_eq!(handler.encode().unwrap(), response.body);
    }

    #[tokio::test]
    async fn test_serve_timeout() {
        let handler = ScrapeHandler::new(
            slow_registry(Duration::from_millis(500)),
            HandlerOptions {
                timeout: Some(Duration::from_millis(20)),
                ..Default::default()
            },
        );
        let response = handler.serve().await;
        assert_eq!(response.status, 503);
        assert!(response.body.contains("Exceeded configured timeout"));
    }

    #[tokio::test]
    async fn test_serve_within_timeout() {
        let handler = ScrapeHandler::new(
            slow_registry(Duration::from_millis(5)),
            HandlerOptions {
                timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
        );
        let response = handler.serve().await;
        assert!(response.is_success());
        assert!(response.body.contains("slow_total 1"));
    }

    #[tokio::test]
    async fn test_serve_in_flight_limit() {
        let handler = ScrapeHandler::new(
            slow_registry(Duration::from_millis(200)),
            HandlerOptions {
                max_requests_in_flight: 1,
                ..Default::default()
            },
        );
        let other = handler.clone();

        let (first, second) = tokio::join!(handler.serve(), other.serve());
        assert_eq!(first.status, 200);
        assert_eq!(second.status, 503);
        assert!(second.body.contains("Limit of concurrent requests reached (1)"));

        // Permit is released once the first scrape completes.
        assert!(handler.serve().await.is_success());
    }

    #[tokio::test]
    async fn test_timed_out_scrape_keeps_its_slot() {
        let handler = ScrapeHandler::new(
            slow_registry(Duration::from_millis(300)),
            HandlerOptions {
                timeout: Some(Duration::from_millis(20)),
                max_requests_in_flight: 1,
                ..Default::default()
            },
        );

        let first = handler.serve().await;
        assert_eq!(first.status, 503);
        assert!(first.body.contains("Exceeded configured timeout"));

        // The first gather is still running, so the slot is still taken.
        let second = handler.serve().await;
        assert_eq!(second.status, 503);
        assert!(second.body.contains("Limit of concurrent requests reached (1)"));

        // Once the abandoned gather finishes, the slot frees up again and
        // the next scrape gets as far as the timeout.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let third = handler.serve().await;
        assert_eq!(third.status, 503);
        assert!(third.body.contains("Exceeded configured timeout"));
    }
}
