//! Parsers for CGI-style `key=value` replies.
//!
//! The registration query answers with lines such as `AccountReg1=1`, the
//! system info query with `UpTime=2.03:15:47` (`days.hh:mm:ss`).

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::model::ProbeResult;

static ACCOUNT_REG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"AccountReg1=(\d+)").unwrap());

static UPTIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UpTime=(\d+)\.(\d{2}):(\d{2}):(\d{2})").unwrap());

/// Raw replies of the two CGI status queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgiPayloads {
    /// Body of `sip_cgi?action=regstatus`.
    pub sip_status: String,
    /// Body of `systeminfo_cgi?action=get`.
    pub system_info: String,
}

impl CgiPayloads {
    /// Parse both replies into a probe result.
    pub fn parse(&self) -> ProbeResult {
        ProbeResult {
            status: parse_status(&self.sip_status),
            uptime_seconds: parse_uptime(&self.system_info),
        }
    }
}

/// Extract the first account's registration state.
///
/// Any non-zero registration code counts as registered.
pub fn parse_status(data: &str) -> u8 {
    let code = ACCOUNT_REG_REGEX
        .captures(data)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());

    match code {
        Some(0) => 0,
        Some(_) => 1,
        None => {
            debug!("AccountReg1 not found in registration reply, assuming offline");
            0
        }
    }
}

/// Extract `UpTime=D.HH:MM:SS` and convert it to seconds.
pub fn parse_uptime(data: &str) -> u64 {
    let Some(caps) = UPTIME_REGEX.captures(data) else {
        debug!("UpTime not found in system info reply, assuming 0");
        return 0;
    };

    // Fields are all digits, so a parse failure means overflow
    let field = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(u64::MAX)
    };

    let days = field(1);
    let hours = field(2);
    let minutes = field(3);
    let seconds = field(4);

    days.saturating_mul(86_400)
        .saturating_add(hours.saturating_mul(3_600))
        .saturating_add(minutes.saturating_mul(60))
        .saturating_add(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_registered() {
        assert_eq!(parse_status("AccountReg1=1"), 1);
        assert_eq!(parse_status("AccountReg1=1\r\nAccountReg2=0\r\n"), 1);
    }

    #[test]
    fn test_parse_status_unregistered() {
        assert_eq!(parse_status("AccountReg1=0"), 0);
        assert_eq!(parse_status("AccountReg2=1"), 0);
    }

    #[test]
    fn test_parse_status_clamps_codes() {
        assert_eq!(parse_status("AccountReg1=2"), 1);
        assert_eq!(parse_status("AccountReg1=00"), 0);
    }

    #[test]
    fn test_parse_status_malformed() {
        assert_eq!(parse_status(""), 0);
        assert_eq!(parse_status("<html>401 Unauthorized</html>"), 0);
        assert_eq!(parse_status("AccountReg1="), 0);
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("UpTime=2.03:15:47"), 184_547);
        assert_eq!(parse_uptime("UpTime=0.00:00:05"), 5);
        assert_eq!(parse_uptime("UpTime=120.23:59:59"), 120 * 86_400 + 86_399);
    }

    #[test]
    fn test_parse_uptime_within_report() {
        let report = "DeviceModel=DKS15120\r\nSoftwareVersion=2.1.0\r\nUpTime=1.00:01:00\r\nMAC=00:11:22:33:44:55\r\n";
        assert_eq!(parse_uptime(report), 86_460);
    }

    #[test]
    fn test_parse_uptime_saturates_huge_day_count() {
        assert_eq!(parse_uptime("UpTime=99999999999999999999.00:00:05"), u64::MAX);
        assert_eq!(parse_uptime("UpTime=999999999999999.00:00:05"), u64::MAX);
    }

    #[test]
    fn test_parse_uptime_malformed() {
        assert_eq!(parse_uptime(""), 0);
        assert_eq!(parse_uptime("UpTime=03:15:47"), 0);
        assert_eq!(parse_uptime("UpTime=2.3:15:47"), 0);
    }

    #[test]
    fn test_payloads_parse() {
        let payloads = CgiPayloads {
            sip_status: "AccountReg1=1".to_string(),
            system_info: "UpTime=2.03:15:47".to_string(),
        };
        assert_eq!(
            payloads.parse(),
            ProbeResult {
                status: 1,
                uptime_seconds: 184_547
            }
        );
    }
}
