//! Metric names and label sets for probe results.

use prometheus_client::encoding::EncodeLabelSet;

/// SIP registration gauge, prefixed.
pub const SIP_STATUS: &str = "sip_status";
pub const SIP_STATUS_HELP: &str = "SIP status of the intercom. 0 = offline; 1 = online";

/// Uptime gauge, prefixed.
pub const UPTIME_SECONDS: &str = "uptime_seconds";
pub const UPTIME_SECONDS_HELP: &str = "Uptime of the intercom in seconds";

/// Probe outcome gauge, never prefixed.
pub const PROBE_SUCCESS: &str = "probe_success";
pub const PROBE_SUCCESS_HELP: &str = "Displays whether or not the probe was a success";

/// Label set shared by every probe gauge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub struct TargetLabels {
    /// Device base address, escaped for the exposition format.
    url: String,
}

impl TargetLabels {
    pub fn new(url: &str) -> Self {
        Self {
            url: escape_label_value(url),
        }
    }

    /// The escaped `url` label value.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Escape `\`, `"` and newlines; the encoder writes label values verbatim.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Check a metric name prefix.
///
/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`. An empty
/// prefix is allowed and leaves names unprefixed.
pub fn is_valid_metric_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        Some(_) => false,
    }
}

/// Build a full metric name from a prefix and a base name.
///
/// Format: `{prefix}_{name}`, or `name` alone for an empty prefix.
pub fn build_metric_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix.trim_end_matches('_'), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefixes() {
        assert!(is_valid_metric_prefix(""));
        assert!(is_valid_metric_prefix("sys_intercom"));
        assert!(is_valid_metric_prefix("_private"));
        assert!(is_valid_metric_prefix("ns:intercom2"));
    }

    #[test]
    fn test_invalid_prefixes() {
        assert!(!is_valid_metric_prefix("2fa"));
        assert!(!is_valid_metric_prefix("sys-intercom"));
        assert!(!is_valid_metric_prefix("sys intercom"));
        assert!(!is_valid_metric_prefix("домофон"));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("http://10.0.0.5"), "http://10.0.0.5");
        assert_eq!(escape_label_value(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_label_value(r"a\b"), r"a\\b");
        assert_eq!(escape_label_value("a\nb"), r"a\nb");
    }

    #[test]
    fn test_target_labels_escape_url() {
        let labels = TargetLabels::new("http://x\"} 0\nevil");
        assert_eq!(labels.url(), r#"http://x\"} 0\nevil"#);
        assert!(!labels.url().contains('\n'));
    }

    #[test]
    fn test_build_metric_name() {
        assert_eq!(
            build_metric_name("sys_intercom", SIP_STATUS),
            "sys_intercom_sip_status"
        );
        assert_eq!(
            build_metric_name("sys_intercom_", UPTIME_SECONDS),
            "sys_intercom_uptime_seconds"
        );
        assert_eq!(build_metric_name("", SIP_STATUS), "sip_status");
    }
}
