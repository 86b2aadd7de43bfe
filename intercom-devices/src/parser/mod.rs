//! Response parsers, one per device family.
//!
//! Parsers are pure: they never perform I/O and never fail. Input that does
//! not match the family's grammar degrades to status 0 / uptime 0, so a
//! malformed reply is reported as an offline device rather than a failed
//! probe.

pub mod cgi;
pub mod json_action;

pub use cgi::CgiPayloads;
pub use json_action::JsonActionPayloads;
