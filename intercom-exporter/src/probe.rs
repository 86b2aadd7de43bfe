//! Probe orchestration: model dispatch, fetch, parse.

use std::time::Duration;

use intercom_devices::adapter::{fetch_cgi_device, fetch_json_action_device};
use intercom_devices::{
    Credentials, DeviceError, DeviceFamily, DeviceModel, InvalidTarget, ProbeResult,
    UnsupportedModel, validate_target,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProbeConfig;

/// Probe errors.
///
/// [`ProbeError::MissingParameter`] and [`ProbeError::InvalidTarget`] are
/// client errors; everything else is reported as `probe_success=0`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("{0}")]
    InvalidTarget(#[from] InvalidTarget),

    #[error("{0}")]
    UnsupportedModel(#[from] UnsupportedModel),

    #[error("Device {target} unreachable: {source}")]
    DeviceUnreachable {
        target: String,
        #[source]
        source: DeviceError,
    },

    #[error("Probe of {target} exceeded {timeout_ms} ms")]
    Timeout { target: String, timeout_ms: u128 },
}

impl ProbeError {
    /// Whether the error is the caller's fault rather than the probe's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProbeError::MissingParameter(_) | ProbeError::InvalidTarget(_)
        )
    }
}

/// Raw `/probe` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeQuery {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub model: Option<String>,
}

/// Probe parameters, all present.
#[derive(Debug, Clone)]
pub struct ProbeParams {
    pub url: String,
    pub username: String,
    pub password: String,
    pub model: String,
}

impl ProbeQuery {
    /// Require every parameter to be present and non-empty.
    pub fn require(self) -> Result<ProbeParams, ProbeError> {
        fn field(value: Option<String>, name: &'static str) -> Result<String, ProbeError> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(ProbeError::MissingParameter(name))
        }

        Ok(ProbeParams {
            url: field(self.url, "url")?,
            username: field(self.username, "username")?,
            password: field(self.password, "password")?,
            model: field(self.model, "model")?,
        })
    }
}

/// A validated probe request.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Device base address, also the `url` label value.
    pub target: String,
    pub credentials: Credentials,
    pub model: DeviceModel,
}

impl TryFrom<ProbeParams> for ProbeRequest {
    type Error = ProbeError;

    fn try_from(params: ProbeParams) -> Result<Self, Self::Error> {
        validate_target(&params.url)?;

        Ok(Self {
            model: params.model.parse()?,
            credentials: Credentials::new(params.username, params.password),
            target: params.url,
        })
    }
}

/// Runs probes against devices.
#[derive(Debug, Clone)]
pub struct Prober {
    timeout: Duration,
}

impl Prober {
    /// Create a prober with the configured per-request timeout.
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }

    /// Probe one device.
    ///
    /// Both status queries run concurrently; the whole probe is bounded by
    /// twice the per-request timeout so a stalled digest handshake cannot
    /// hang it. No retries.
    pub async fn run(&self, request: &ProbeRequest) -> Result<ProbeResult, ProbeError> {
        debug!(target = %request.target, model = %request.model, "Probing device");

        let deadline = self.timeout * 2;
        let outcome = match tokio::time::timeout(deadline, self.dispatch(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout {
                target: request.target.clone(),
                timeout_ms: deadline.as_millis(),
            }),
        };

        match &outcome {
            Ok(result) => debug!(
                target = %request.target,
                model = %request.model,
                status = result.status,
                uptime_seconds = result.uptime_seconds,
                "Probe succeeded"
            ),
            Err(e) => warn!(
                target = %request.target,
                model = %request.model,
                error = %e,
                "Probe failed"
            ),
        }

        outcome
    }

    async fn dispatch(&self, request: &ProbeRequest) -> Result<ProbeResult, ProbeError> {
        let target = request.target.as_str();
        let unreachable = |source| ProbeError::DeviceUnreachable {
            target: target.to_string(),
            source,
        };

        match request.model.family() {
            DeviceFamily::Cgi => {
                let payloads = fetch_cgi_device(target, request.credentials.clone(), self.timeout)
                    .await
                    .map_err(unreachable)?;
                Ok(payloads.parse())
            }
            DeviceFamily::JsonAction => {
                let payloads =
                    fetch_json_action_device(target, request.credentials.clone(), self.timeout)
                        .await
                        .map_err(unreachable)?;
                Ok(payloads.parse())
            }
            DeviceFamily::Unsupported => Err(UnsupportedModel(request.model.to_string()).into()),
        }
    }
}
