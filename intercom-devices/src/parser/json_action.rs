//! Parsers for JSON action API replies.

use serde_json::Value;
use tracing::debug;

use crate::model::ProbeResult;

/// `Account1.Status` value reported for a registered SIP account.
pub const REGISTERED_STATUS: &str = "2";

/// `data` members of the two action replies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonActionPayloads {
    /// Reply to `{"target":"system","action":"status"}`, carries `UpTime`.
    pub status: Value,
    /// Reply to `{"target":"system","action":"info"}`, carries `Account1`.
    pub info: Value,
}

impl JsonActionPayloads {
    /// Parse both replies into a probe result.
    pub fn parse(&self) -> ProbeResult {
        ProbeResult {
            status: parse_status(&self.info),
            uptime_seconds: parse_uptime(&self.status),
        }
    }
}

/// 1 when `Account1.Status` equals [`REGISTERED_STATUS`], otherwise 0.
pub fn parse_status(data: &Value) -> u8 {
    let registered = match data.pointer("/Account1/Status") {
        Some(Value::String(s)) => s == REGISTERED_STATUS,
        Some(Value::Number(n)) => n.to_string() == REGISTERED_STATUS,
        Some(_) => false,
        None => {
            debug!("Account1.Status missing from info reply, assuming offline");
            false
        }
    };

    u8::from(registered)
}

/// Read `UpTime` seconds, defaulting to 0.
pub fn parse_uptime(data: &Value) -> u64 {
    match data.get("UpTime") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => {
            debug!("UpTime missing from status reply, assuming 0");
            0
        }
    }
}
