//! Metric registries for probe results.
//!
//! Every probe request gets its own [`ScopedMetrics`]: a fresh registry with
//! the three probe gauges registered, rendered once and then discarded.
//! Successful results are also mirrored into the process-wide
//! [`GlobalMetrics`], which is created at startup, overwritten per target and
//! never cleared.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use intercom_devices::ProbeResult;
use parking_lot::RwLock;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::trace;

use crate::config::MetricsConfig;
use crate::mapping::{
    PROBE_SUCCESS, PROBE_SUCCESS_HELP, SIP_STATUS, SIP_STATUS_HELP, TargetLabels, UPTIME_SECONDS,
    UPTIME_SECONDS_HELP, build_metric_name,
};

/// Content type of rendered registries.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

type TargetGauge = Family<TargetLabels, Gauge>;

/// Create an empty registry carrying the `app` label, if configured.
fn new_registry(app_name: Option<&str>) -> Registry {
    match app_name {
        Some(app) => Registry::with_labels(
            [(Cow::Borrowed("app"), Cow::Owned(app.to_string()))].into_iter(),
        ),
        None => Registry::default(),
    }
}

fn render_registry(registry: &Registry) -> Result<String, fmt::Error> {
    let mut output = String::new();
    encode(&mut output, registry)?;
    Ok(output)
}

/// Status and uptime gauges registered in one registry.
#[derive(Clone, Default)]
struct DeviceGauges {
    sip_status: TargetGauge,
    uptime_seconds: TargetGauge,
}

impl DeviceGauges {
    fn register(registry: &mut Registry, prefix: &str) -> Self {
        let gauges = Self::default();
        registry.register(
            build_metric_name(prefix, SIP_STATUS),
            SIP_STATUS_HELP,
            gauges.sip_status.clone(),
        );
        registry.register(
            build_metric_name(prefix, UPTIME_SECONDS),
            UPTIME_SECONDS_HELP,
            gauges.uptime_seconds.clone(),
        );
        gauges
    }

    fn set(&self, labels: &TargetLabels, result: &ProbeResult) {
        self.sip_status
            .get_or_create(labels)
            .set(i64::from(result.status));
        self.uptime_seconds
            .get_or_create(labels)
            .set(i64::try_from(result.uptime_seconds).unwrap_or(i64::MAX));
    }

    fn clear(&self) {
        self.sip_status.clear();
        self.uptime_seconds.clear();
    }
}

/// Process-wide aggregate of the last successful probe per target.
pub struct GlobalMetrics {
    registry: Registry,
    gauges: DeviceGauges,
}

impl GlobalMetrics {
    /// Create the aggregate registry.
    pub fn new(config: &MetricsConfig) -> Self {
        let mut registry = new_registry(config.app_name.as_deref());
        let gauges = DeviceGauges::register(&mut registry, &config.prefix);
        Self { registry, gauges }
    }

    /// Render in OpenMetrics text format.
    pub fn render(&self) -> Result<String, fmt::Error> {
        render_registry(&self.registry)
    }
}

/// Registry owned by a single probe request.
pub struct ScopedMetrics {
    registry: Registry,
    gauges: DeviceGauges,
    probe_success: TargetGauge,
}

impl ScopedMetrics {
    fn new(config: &MetricsConfig) -> Self {
        let mut registry = new_registry(config.app_name.as_deref());
        let gauges = DeviceGauges::register(&mut registry, &config.prefix);
        let probe_success = TargetGauge::default();
        registry.register(PROBE_SUCCESS, PROBE_SUCCESS_HELP, probe_success.clone());

        Self {
            registry,
            gauges,
            probe_success,
        }
    }

    /// Render in OpenMetrics text format.
    pub fn render(&self) -> Result<String, fmt::Error> {
        render_registry(&self.registry)
    }

    /// Empty every gauge family and drop the registry.
    pub fn discard(self) {
        self.gauges.clear();
        self.probe_success.clear();
    }
}

/// Probe outcome statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// Probes recorded, successful or not.
    pub probes_total: u64,
    /// Probes that produced a result.
    pub probes_succeeded: u64,
    /// Probes recorded as failed.
    pub probes_failed: u64,
}

/// Creates scoped registries and records probe outcomes.
pub struct MetricsManager {
    config: MetricsConfig,
    global: Arc<GlobalMetrics>,
    stats: RwLock<ProbeStats>,
}

impl MetricsManager {
    /// Create a manager with its own global registry.
    pub fn new(config: MetricsConfig) -> Self {
        let global = Arc::new(GlobalMetrics::new(&config));
        Self::with_global(config, global)
    }

    /// Create a manager mirroring into an existing global registry.
    pub fn with_global(config: MetricsConfig, global: Arc<GlobalMetrics>) -> Self {
        Self {
            config,
            global,
            stats: RwLock::new(ProbeStats::default()),
        }
    }

    /// The aggregate registry.
    pub fn global(&self) -> &Arc<GlobalMetrics> {
        &self.global
    }

    /// Allocate an empty registry for one probe.
    pub fn new_scoped(&self) -> ScopedMetrics {
        ScopedMetrics::new(&self.config)
    }

    /// Record a successful probe.
    ///
    /// Sets status, uptime and `probe_success=1` in `scoped`, and mirrors
    /// status and uptime into the global registry under the same target.
    pub fn record_success(&self, scoped: &ScopedMetrics, target: &str, result: &ProbeResult) {
        let labels = TargetLabels::new(target);

        scoped.gauges.set(&labels, result);
        scoped.probe_success.get_or_create(&labels).set(1);
        self.global.gauges.set(&labels, result);

        trace!(
            target = %target,
            status = result.status,
            uptime_seconds = result.uptime_seconds,
            "Recorded probe result"
        );

        let mut stats = self.stats.write();
        stats.probes_total += 1;
        stats.probes_succeeded += 1;
    }

    /// Record a failed probe.
    ///
    /// Only `probe_success=0` is set; the global registry keeps the target's
    /// last known values.
    pub fn record_failure(&self, scoped: &ScopedMetrics, target: &str) {
        scoped
            .probe_success
            .get_or_create(&TargetLabels::new(target))
            .set(0);

        let mut stats = self.stats.write();
        stats.probes_total += 1;
        stats.probes_failed += 1;
    }

    /// Get probe statistics.
    pub fn stats(&self) -> ProbeStats {
        self.stats.read().clone()
    }
}

/// Shareable manager handle.
pub type SharedMetrics = Arc<MetricsManager>;

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MetricsManager {
        MetricsManager::new(MetricsConfig::default())
    }

    fn samples(output: &str) -> Vec<&str> {
        output.lines().filter(|l| !l.starts_with('#')).collect()
    }

    fn result(status: u8, uptime_seconds: u64) -> ProbeResult {
        ProbeResult {
            status,
            uptime_seconds,
        }
    }

    #[test]
    fn test_fresh_scoped_registry_has_no_samples() {
        let manager = manager();
        let scoped = manager.new_scoped();

        let output = scoped.render().unwrap();

        assert!(samples(&output).is_empty(), "unexpected samples: {output}");
        assert!(output.contains("# TYPE sys_intercom_sip_status gauge"));
        assert!(output.contains("# TYPE sys_intercom_uptime_seconds gauge"));
        assert!(output.contains("# TYPE probe_success gauge"));
        assert!(output.ends_with("# EOF\n"));
    }

    #[test]
    fn test_record_success() {
        let manager = manager();
        let scoped = manager.new_scoped();

        manager.record_success(&scoped, "http://10.0.0.5", &result(1, 184_547));
        let output = scoped.render().unwrap();

        assert!(output.contains("sys_intercom_sip_status{url=\"http://10.0.0.5\"} 1"));
        assert!(output.contains("sys_intercom_uptime_seconds{url=\"http://10.0.0.5\"} 184547"));
        assert!(output.contains("probe_success{url=\"http://10.0.0.5\"} 1"));
        assert_eq!(samples(&output).len(), 3);
    }

    #[test]
    fn test_record_success_mirrors_into_global() {
        let manager = manager();
        let scoped = manager.new_scoped();

        manager.record_success(&scoped, "http://10.0.0.5", &result(0, 60));
        let global = manager.global().render().unwrap();

        assert!(global.contains("sys_intercom_sip_status{url=\"http://10.0.0.5\"} 0"));
        assert!(global.contains("sys_intercom_uptime_seconds{url=\"http://10.0.0.5\"} 60"));
        assert!(!global.contains("probe_success"));
    }

    #[test]
    fn test_record_failure_only_sets_success() {
        let manager = manager();
        let scoped = manager.new_scoped();

        manager.record_failure(&scoped, "http://10.0.0.9");
        let output = scoped.render().unwrap();

        assert_eq!(samples(&output), vec!["probe_success{url=\"http://10.0.0.9\"} 0"]);
        assert!(samples(&manager.global().render().unwrap()).is_empty());
    }

    #[test]
    fn test_failure_keeps_last_known_global_values() {
        let manager = manager();

        let first = manager.new_scoped();
        manager.record_success(&first, "http://10.0.0.5", &result(1, 100));
        first.discard();

        let second = manager.new_scoped();
        manager.record_failure(&second, "http://10.0.0.5");
        second.discard();

        let global = manager.global().render().unwrap();
        assert!(global.contains("sys_intercom_sip_status{url=\"http://10.0.0.5\"} 1"));
        assert!(global.contains("sys_intercom_uptime_seconds{url=\"http://10.0.0.5\"} 100"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let manager = manager();
        let scoped = manager.new_scoped();

        manager.record_failure(&scoped, "http://x\"} 0\nevil_metric{a=\"");
        let output = scoped.render().unwrap();

        assert_eq!(
            samples(&output),
            vec![r#"probe_success{url="http://x\"} 0\nevil_metric{a=\""} 0"#]
        );
    }

    #[test]
    fn test_global_overwrites_per_target() {
        let manager = manager();

        for uptime in [10, 20, 30] {
            let scoped = manager.new_scoped();
            manager.record_success(&scoped, "http://10.0.0.5", &result(1, uptime));
            scoped.discard();
        }
        let scoped = manager.new_scoped();
        manager.record_success(&scoped, "http://10.0.0.6", &result(0, 5));
        scoped.discard();

        let global = manager.global().render().unwrap();
        let uptime_lines: Vec<_> = samples(&global)
            .into_iter()
            .filter(|l| l.starts_with("sys_intercom_uptime_seconds"))
            .collect();

        assert_eq!(uptime_lines.len(), 2);
        assert!(global.contains("sys_intercom_uptime_seconds{url=\"http://10.0.0.5\"} 30"));
        assert!(global.contains("sys_intercom_uptime_seconds{url=\"http://10.0.0.6\"} 5"));
    }

    #[test]
    fn test_scoped_registries_are_isolated() {
        let manager = manager();
        let a = manager.new_scoped();
        let b = manager.new_scoped();

        manager.record_success(&a, "http://a", &result(1, 1));
        manager.record_failure(&b, "http://b");

        let out_a = a.render().unwrap();
        let out_b = b.render().unwrap();

        assert!(!out_a.contains("http://b"));
        assert!(!out_b.contains("http://a"));
    }

    #[test]
    fn test_discard_clears_families() {
        let manager = manager();
        let scoped = manager.new_scoped();
        manager.record_success(&scoped, "http://10.0.0.5", &result(1, 1));

        let gauges = scoped.gauges.clone();
        let probe_success = scoped.probe_success.clone();
        scoped.discard();

        let mut registry = Registry::default();
        registry.register("sip_status", "", gauges.sip_status);
        registry.register("uptime_seconds", "", gauges.uptime_seconds);
        registry.register("probe_success", "", probe_success);
        assert!(samples(&render_registry(&registry).unwrap()).is_empty());
    }

    #[test]
    fn test_custom_prefix_and_app_label() {
        let manager = MetricsManager::new(MetricsConfig {
            prefix: "door".to_string(),
            app_name: Some("intercoms".to_string()),
        });
        let scoped = manager.new_scoped();

        manager.record_success(&scoped, "http://10.0.0.5", &result(1, 7));
        let output = scoped.render().unwrap();

        assert!(output.contains("door_sip_status{"));
        assert!(output.contains("door_uptime_seconds{"));
        assert!(output.contains("probe_success{"));
        assert!(!output.contains("door_probe_success"));
        assert!(output.contains("app=\"intercoms\""));
        assert!(
            manager
                .global()
                .render()
                .unwrap()
                .contains("app=\"intercoms\"")
        );
    }

    #[test]
    fn test_stats() {
        let manager = manager();
        let scoped = manager.new_scoped();

        manager.record_success(&scoped, "http://a", &result(1, 1));
        manager.record_failure(&scoped, "http://b");
        manager.record_failure(&scoped, "http://c");

        assert_eq!(
            manager.stats(),
            ProbeStats {
                probes_total: 3,
                probes_succeeded: 1,
                probes_failed: 2,
            }
        );
    }
}
