//! Prometheus probe exporter for SIP intercom panels.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info};

use intercom_exporter::config::LogFormat;
use intercom_exporter::{ExporterConfig, HttpServer, MetricsManager, Prober, init_tracing};

/// Prometheus probe exporter for SIP intercom panels.
#[derive(Parser, Debug)]
#[command(name = "intercom-exporter")]
#[command(about = "Probe SIP intercoms and export their status as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Listen host (overrides config).
    #[arg(long, env = "APP_HOST")]
    host: Option<String>,

    /// Listen port (overrides config).
    #[arg(long, env = "APP_PORT")]
    port: Option<u16>,

    /// Prefix for the status and uptime metrics (overrides config).
    #[arg(long, env = "SERVICE_PREFIX")]
    prefix: Option<String>,

    /// Value of the `app` label on every metric (overrides config).
    #[arg(long, env = "APP_NAME")]
    app_name: Option<String>,

    /// Require HTTP basic auth on every route.
    #[arg(long, env = "AUTH_ENABLED")]
    auth_enabled: Option<bool>,

    /// Basic auth username.
    #[arg(long, env = "AUTH_USER")]
    auth_user: Option<String>,

    /// Basic auth password.
    #[arg(long, env = "AUTH_PASS", hide_env_values = true)]
    auth_pass: Option<String>,

    /// Per-request device timeout in milliseconds (overrides config).
    #[arg(long, env = "PROBE_TIMEOUT_MS")]
    probe_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    /// Apply command line and environment overrides to the config.
    fn apply(self, config: &mut ExporterConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(prefix) = self.prefix {
            config.metrics.prefix = prefix;
        }
        if let Some(app_name) = self.app_name {
            config.metrics.app_name = Some(app_name);
        }
        if let Some(enabled) = self.auth_enabled {
            config.auth.enabled = enabled;
        }
        if let Some(user) = self.auth_user {
            config.auth.username = Some(user);
        }
        if let Some(pass) = self.auth_pass {
            config.auth.password = Some(pass);
        }
        if let Some(timeout_ms) = self.probe_timeout_ms {
            config.probe.timeout_ms = timeout_ms;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    args.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(
        listen = %config.server.listen_addr(),
        prefix = %config.metrics.prefix,
        auth = config.auth.enabled,
        timeout_ms = config.probe.timeout_ms,
        "Starting intercom exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(MetricsManager::new(config.metrics.clone()));
    let prober = Prober::new(&config.probe);

    let http_server = HttpServer::new(
        metrics.clone(),
        prober,
        config.server.listen_addr(),
        config.auth.credentials(),
    );

    let mut http_task = tokio::spawn(async move { http_server.run(shutdown_rx).await });

    // Wait for shutdown signal
    let server_exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            None
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(_) => std::future::pending::<()>().await,
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
            None
        }
        result = &mut http_task => Some(result),
    };

    // Signal shutdown
    let _ = shutdown_tx.send(true);

    let outcome = match server_exit {
        Some(result) => {
            let err = unexpected_exit(result);
            error!("HTTP server exited unexpectedly: {}", err);
            Err(err)
        }
        None => {
            // Wait for the server to drain
            if let Ok(Ok(Err(e))) = tokio::time::timeout(Duration::from_secs(5), http_task).await {
                error!("HTTP server error: {}", e);
            }
            Ok(())
        }
    };

    let stats = metrics.stats();
    info!(
        probes_total = stats.probes_total,
        probes_succeeded = stats.probes_succeeded,
        probes_failed = stats.probes_failed,
        "Final statistics"
    );

    info!("Exporter stopped");
    outcome
}

/// Error for a server task that ended before shutdown was requested.
fn unexpected_exit(result: Result<anyhow::Result<()>, JoinError>) -> anyhow::Error {
    match result {
        Ok(Ok(())) => anyhow::anyhow!("HTTP server stopped before shutdown was requested"),
        Ok(Err(e)) => e,
        Err(e) => anyhow::anyhow!("HTTP server task failed: {}", e),
    }
}
