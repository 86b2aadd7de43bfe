use std::time::Duration;

use serde_json::Value;

use super::{Credentials, DeviceClient, build_http, join_url, read_json, read_text};
use crate::error::{DeviceError, Result};

/// Client sending credentials in a `Authorization: Basic` header.
#[derive(Debug, Clone)]
pub struct BasicAuthClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl BasicAuthClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        Ok(Self {
            http: build_http(timeout, &base_url)?,
            base_url,
            credentials,
        })
    }
}

impl DeviceClient for BasicAuthClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = join_url(&self.base_url, path);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| DeviceError::from_reqwest(&url, e))?;

        read_text(&url, response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = join_url(&self.base_url, path);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(payload)
            .send()
            .await
            .map_err(|e| DeviceError::from_reqwest(&url, e))?;

        read_json(&url, response).await
    }
}
