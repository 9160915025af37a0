//! Standalone HTTP endpoint for scraping.
//!
//! Processes that do not already run an HTTP server can expose a
//! [`ScrapeHandler`] through this minimal listener.
//!
//! # Endpoints
//!
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - Liveness check (always returns 200 if server is running)
//!
//! # Usage
//!
//! ```rust,no_run
//! use kmetrics::constants::{DEFAULT_METRICS_ADDR, DEFAULT_NAMESPACE};
//! use kmetrics::exporter::MetricsServer;
//! use kmetrics::metrics::BrokerMetrics;
//!
//! #[tokio::main]
//! async fn main() -> kmetrics::error::Result<()> {
//!     let metrics = BrokerMetrics::new(DEFAULT_NAMESPACE)?;
//!     let server = MetricsServer::new(DEFAULT_METRICS_ADDR, metrics.handler()).await?;
//!     server.run().await
//! }
//! ```

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::constants::MAX_REQUEST_HEAD_SIZE;
use crate::error::Result;
use crate::scrape::ScrapeHandler;

/// Lightweight HTTP server for the scrape endpoint.
pub struct MetricsServer {
    listener: TcpListener,
    handler: ScrapeHandler,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl MetricsServer {
    /// Bind a new server to `addr` (e.g. "0.0.0.0:9308").
    pub async fn new(addr: &str, handler: ScrapeHandler) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(addr = %addr, "Metrics server listening");

        Ok(Self {
            listener,
            handler,
            shutdown_tx,
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Initiate graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Metrics server shutdown signal sent");
    }

    /// Run the server until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Metrics server shutting down");
                    return Ok(());
                }
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((mut stream, addr)) => {
                            debug!(client_addr = %addr, "Metrics connection");

                            let handler = self.handler.clone();
                            tokio::spawn(async move {
                                let mut buf = [0u8; MAX_REQUEST_HEAD_SIZE];
                                match stream.read(&mut buf).await {
                                    Ok(n) if n > 0 => {
                                        let request = String::from_utf8_lossy(&buf[..n]);
                                        let response = handle_request(&request, &handler).await;
                                        let written = stream.write_all(response.as_bytes()).await;
                                        if let Err(e) = written {
                                            debug!(error = ?e, "Failed to write metrics response");
                                        }
                                    }
                                    Ok(_) => {
                                        debug!("Empty request received");
                                    }
                                    Err(e) => {
                                        debug!(error = ?e, "Failed to read metrics request");
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = ?e, "Failed to accept metrics connection");
                        }
                    }
                }
            }
        }
    }
}

/// Route an HTTP request and return the raw response.
async fn handle_request(request: &str, handler: &ScrapeHandler) -> String {
    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();

    let path = if parts.len() >= 2 { parts[1] } else { "/" };

    match path {
        "/metrics" | "/metrics/" => handler.serve().await.to_http(),
        "/health" | "/healthz" | "/health/" => health_response(),
        _ => not_found_response(),
    }
}

fn health_response() -> String {
    "HTTP/1.1 200 OK\r\n\
     Content-Type: text/plain\r\n\
     Connection: close\r\n\
     \r\n\
     status: healthy\n"
        .to_string()
}

fn not_found_response() -> String {
    "HTTP/1.1 404 Not Found\r\n\
     Content-Type: text/plain\r\n\
     Connection: close\r\n\
     \r\n\
     Available endpoints:\n\
     - /metrics - Prometheus metrics\n\
     - /health - Liveness check\n"
        .to_string()
}
