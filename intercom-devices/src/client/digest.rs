use std::time::Duration;

use digest_auth::AuthContext;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::trace;

use super::{Credentials, DeviceClient, build_http, join_url, read_json, read_text};
use crate::error::{DeviceError, Result};

/// Client answering an HTTP digest challenge.
///
/// Each call sends the request unauthenticated first; a `401` carrying a
/// `WWW-Authenticate: Digest` challenge is answered once with the computed
/// `Authorization` header.
#[derive(Debug, Clone)]
pub struct DigestAuthClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl DigestAuthClient {
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

    fn request(&self, method: Method, url: &str, body: Option<&[u8]>) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec()),
            None => builder,
        }
    }

    async fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<reqwest::Response> {
        let request = self
            .request(method.clone(), url, body)
            .build()
            .map_err(|e| DeviceError::from_reqwest(url, e))?;
        let uri = request_uri(request.url());

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| DeviceError::from_reqwest(url, e))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DeviceError::MissingChallenge {
                url: url.to_string(),
            })?;

        trace!(url = %url, "Answering digest challenge");

        let mut prompt = digest_auth::parse(challenge)?;
        let username = self.credentials.username.as_str();
        let password = self.credentials.password.as_str();
        let context = if method == Method::POST {
            AuthContext::new_post(username, password, uri.as_str(), body)
        } else {
            AuthContext::new(username, password, uri.as_str())
        };
        let answer = prompt.respond(&context)?;

        self.request(method, url, body)
            .header(AUTHORIZATION, answer.to_header_string())
            .send()
            .await
            .map_err(|e| DeviceError::from_reqwest(url, e))
    }
}

impl DeviceClient for DigestAuthClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = join_url(&self.base_url, path);
        let response = self.send(Method::GET, &url, None).await?;
        read_text(&url, response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = join_url(&self.base_url, path);
        let body = serde_json::to_vec(payload).map_err(|source| DeviceError::Body {
            url: url.clone(),
            source,
        })?;
        let response = self.send(Method::POST, &url, Some(&body)).await?;
        read_json(&url, response).await
    }
}

/// Request-URI as covered by the digest response (path plus query).
fn request_uri(url: &reqwest::Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uri() {
        let url = reqwest::Url::parse("http://10.0.0.7/api").unwrap();
        assert_eq!(request_uri(&url), "/api");

        let url = reqwest::Url::parse("http://10.0.0.7/cgi-bin/x?action=get").unwrap();
        assert_eq!(request_uri(&url), "/cgi-bin/x?action=get");
    }
}
