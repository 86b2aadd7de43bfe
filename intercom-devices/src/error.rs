use thiserror::Error;

/// Errors raised while fetching status payloads from a device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP error from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Device at {url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Device at {url} requested digest auth without a usable challenge")]
    MissingChallenge { url: String },

    #[error("Digest authentication failed: {0}")]
    Digest(#[from] digest_auth::Error),

    #[error("Invalid response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DeviceError {
    /// Classify a reqwest failure for the given URL.
    pub fn from_reqwest(url: impl Into<String>, err: reqwest::Error) -> Self {
        let url = url.into();
        if err.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Http { url, source: err }
        }
    }
}

/// Model identifier outside the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported intercom model: {0}")]
pub struct UnsupportedModel(pub String);

/// Device address that cannot be probed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid target {target:?}: {reason}")]
pub struct InvalidTarget {
    pub target: String,
    pub reason: &'static str,
}

/// Result type alias using [`DeviceError`].
pub type Result<T> = std::result::Result<T, DeviceError>;
