//! Intercom Devices Library
//!
//! Device-side building blocks of the intercom exporter:
//!
//! - [`model`] - Supported intercom models and the normalized [`ProbeResult`]
//! - [`client`] - Basic- and digest-authenticated HTTP clients
//! - [`adapter`] - Per-family fetch strategies (CGI, JSON action)
//! - [`parser`] - Pure parsers turning raw replies into status and uptime
//! - [`error`] - Error types

pub mod adapter;
pub mod client;
pub mod error;
pub mod model;
pub mod parser;

// Re-export commonly used types at the crate root
pub use client::{
    BasicAuthClient, Credentials, DEFAULT_TIMEOUT, DeviceClient, DigestAuthClient, validate_target,
};
pub use error::{DeviceError, InvalidTarget, Result, UnsupportedModel};
pub use model::{DeviceFamily, DeviceModel, ProbeResult};
pub use parser::{CgiPayloads, JsonActionPayloads};
