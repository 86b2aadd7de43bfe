//! Authenticated HTTP clients for device status interfaces.
//!
//! A client is built for a single probe from the caller's credentials and
//! dropped afterwards; nothing is shared between probes.

mod basic;
mod digest;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::error::{DeviceError, InvalidTarget, Result};

pub use basic::BasicAuthClient;
pub use digest::DigestAuthClient;

/// Default per-request timeout for device calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Device login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP access to a device, one implementation per auth scheme.
pub trait DeviceClient {
    /// Base URL every request path is appended to.
    fn base_url(&self) -> &str;

    /// GET `path` and return the body as text.
    fn get_text(&self, path: &str) -> impl Future<Output = Result<String>> + Send;

    /// POST `payload` as JSON to `path` and return the decoded JSON reply.
    fn post_json(&self, path: &str, payload: &Value)
    -> impl Future<Output = Result<Value>> + Send;
}

/// Check that `target` is an absolute http(s) URL with a host.
///
/// The target is also reported back as a metric label, so quotes,
/// backslashes and control characters are refused outright.
pub fn validate_target(target: &str) -> std::result::Result<reqwest::Url, InvalidTarget> {
    let invalid = |reason| InvalidTarget {
        target: target.to_string(),
        reason,
    };

    if target
        .chars()
        .any(|c| c == '"' || c == '\\' || c.is_control())
    {
        return Err(invalid("contains a quote, backslash or control character"));
    }

    let url = reqwest::Url::parse(target).map_err(|_| invalid("not a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(url)
}

/// Join a device address and a path, tolerating a trailing slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn build_http(timeout: Duration, base_url: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DeviceError::from_reqwest(base_url, e))
}

fn ensure_success(url: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(DeviceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

async fn read_text(url: &str, response: reqwest::Response) -> Result<String> {
    ensure_success(url, &response)?;
    response
        .text()
        .await
        .map_err(|e| DeviceError::from_reqwest(url, e))
}

async fn read_json(url: &str, response: reqwest::Response) -> Result<Value> {
    ensure_success(url, &response)?;
    let body = response
        .bytes()
        .await
        .map_err(|e| DeviceError::from_reqwest(url, e))?;
    serde_json::from_slice(&body).map_err(|source| DeviceError::Body {
        url: url.to_string(),
        source,
    })
}
