use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::UnsupportedModel;

/// Intercom hardware model, as named by the `model` probe parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceModel {
    #[serde(rename = "BEWARD DKS")]
    BewardDks,
    #[serde(rename = "BEWARD DS")]
    BewardDs,
    #[serde(rename = "AKUVOX")]
    Akuvox,
    #[serde(rename = "QTECH")]
    Qtech,
}

/// Status interface family a model speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    /// Plain-text `key=value` replies from `/cgi-bin`, basic auth.
    Cgi,
    /// JSON `{target, action}` POSTs to `/api`, digest auth.
    JsonAction,
    /// Recognized model without a status client.
    Unsupported,
}

impl DeviceModel {
    /// All recognized models.
    pub const ALL: [DeviceModel; 4] = [
        DeviceModel::BewardDks,
        DeviceModel::BewardDs,
        DeviceModel::Akuvox,
        DeviceModel::Qtech,
    ];

    /// Get the identifier used in probe requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceModel::BewardDks => "BEWARD DKS",
            DeviceModel::BewardDs => "BEWARD DS",
            DeviceModel::Akuvox => "AKUVOX",
            DeviceModel::Qtech => "QTECH",
        }
    }

    /// Get the status interface family for this model.
    pub fn family(&self) -> DeviceFamily {
        match self {
            DeviceModel::BewardDks | DeviceModel::BewardDs => DeviceFamily::Cgi,
            DeviceModel::Akuvox => DeviceFamily::JsonAction,
            DeviceModel::Qtech => DeviceFamily::Unsupported,
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceModel {
    type Err = UnsupportedModel;

    /// Case-insensitive; `_` and `-` may stand in for the space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' => ' ',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        DeviceModel::ALL
            .into_iter()
            .find(|model| model.as_str() == normalized)
            .ok_or_else(|| UnsupportedModel(s.to_string()))
    }
}

/// Normalized outcome of a successful probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    /// SIP registration status: 1 = registered/online, 0 = offline.
    pub status: u8,
    /// Device uptime in seconds.
    pub uptime_seconds: u64,
}
