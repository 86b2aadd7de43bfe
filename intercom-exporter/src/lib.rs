//! Prometheus probe exporter for SIP intercom panels.
//!
//! This crate queries intercom devices on demand and exposes their SIP
//! registration status and uptime for Prometheus scraping.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   HTTP Server   │────>│     Prober      │────>│ Intercom device │
//! │ (/probe, /metrics)    │ (model dispatch)│     │  (CGI / JSON)   │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!          │
//!          v
//! ┌─────────────────┐
//! │ MetricsManager  │  scoped registry per probe + global aggregate
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! intercom-exporter --config config.json5
//! curl 'http://localhost:9100/probe?url=http://10.0.0.5&username=admin&password=secret&model=BEWARD%20DKS'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod http;
pub mod mapping;
pub mod probe;
pub mod registry;

pub use config::ExporterConfig;
pub use http::{HttpServer, create_router};
pub use probe::{ProbeError, ProbeRequest, Prober};
pub use registry::{GlobalMetrics, MetricsManager, ScopedMetrics, SharedMetrics};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &config::LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        config::LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        config::LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}
