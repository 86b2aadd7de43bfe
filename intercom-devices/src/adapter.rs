//! Per-family fetch strategies.
//!
//! Each adapter issues the family's two status queries concurrently and
//! hands back the raw payloads for the matching parser. If either query
//! fails the whole fetch fails.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::client::{BasicAuthClient, Credentials, DeviceClient, DigestAuthClient, join_url};
use crate::error::Result;
use crate::parser::{CgiPayloads, JsonActionPayloads};

/// CGI endpoints, relative to `{target}/cgi-bin`.
pub mod cgi {
    pub const BASE_PATH: &str = "/cgi-bin";
    pub const PATH_SIP_STATUS: &str = "/sip_cgi?action=regstatus&AccountReg";
    pub const PATH_SYSINFO: &str = "/systeminfo_cgi?action=get";
}

/// JSON action endpoint, relative to `{target}`.
pub mod json_action {
    pub const BASE_PATH: &str = "/api";
    pub const TARGET_SYSTEM: &str = "system";
    pub const ACTION_STATUS: &str = "status";
    pub const ACTION_INFO: &str = "info";
}

/// Fetch the registration and system info replies of a CGI device.
pub async fn fetch_cgi<C: DeviceClient>(client: &C) -> Result<CgiPayloads> {
    debug!(base_url = %client.base_url(), "Querying CGI status");

    let (sip_status, system_info) = tokio::try_join!(
        client.get_text(cgi::PATH_SIP_STATUS),
        client.get_text(cgi::PATH_SYSINFO),
    )?;

    Ok(CgiPayloads {
        sip_status,
        system_info,
    })
}

/// Fetch the `status` and `info` action replies of a JSON action device.
pub async fn fetch_json_action<C: DeviceClient>(client: &C) -> Result<JsonActionPayloads> {
    debug!(base_url = %client.base_url(), "Querying JSON action status");

    let status_payload = action_payload(json_action::ACTION_STATUS);
    let info_payload = action_payload(json_action::ACTION_INFO);

    let (status, info) = tokio::try_join!(
        client.post_json("", &status_payload),
        client.post_json("", &info_payload),
    )?;

    Ok(JsonActionPayloads {
        status: unwrap_data(status),
        info: unwrap_data(info),
    })
}

/// Connect to a CGI device with basic auth and fetch its payloads.
pub async fn fetch_cgi_device(
    target: &str,
    credentials: Credentials,
    timeout: Duration,
) -> Result<CgiPayloads> {
    let client = BasicAuthClient::new(join_url(target, cgi::BASE_PATH), credentials, timeout)?;
    fetch_cgi(&client).await
}

/// Connect to a JSON action device with digest auth and fetch its payloads.
pub async fn fetch_json_action_device(
    target: &str,
    credentials: Credentials,
    timeout: Duration,
) -> Result<JsonActionPayloads> {
    let client =
        DigestAuthClient::new(join_url(target, json_action::BASE_PATH), credentials, timeout)?;
    fetch_json_action(&client).await
}

fn action_payload(action: &str) -> Value {
    json!({
        "target": json_action::TARGET_SYSTEM,
        "action": action,
    })
}

/// Replies are wrapped as `{"retcode": 0, "data": {...}}`.
fn unwrap_data(mut reply: Value) -> Value {
    reply
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null)
}
