//! Group and device derivation from request metadata.

use std::net::{IpAddr, SocketAddr};

use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use pasty_core::{Device, Group};
use woothee::parser::Parser;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN: &str = "Unknown";
/// What the parser reports for fields it could not classify.
const PARSER_UNKNOWN: &str = "UNKNOWN";

/// Who is on the other end of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub group: Group,
    pub device: Device,
}

impl Peer {
    pub fn from_request(headers: &HeaderMap, remote: SocketAddr, trust_forwarded_for: bool) -> Self {
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Self {
            group: group_from(headers, remote, trust_forwarded_for),
            device: device_from_user_agent(user_agent),
        }
    }
}

/// The client's network origin: first `X-Forwarded-For` hop when trusted,
/// otherwise the TCP peer address.
pub fn group_from(headers: &HeaderMap, remote: SocketAddr, trust_forwarded_for: bool) -> Group {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return Group::new(normalize_hop(hop));
        }
    }
    Group::new(remote.ip().to_string())
}

fn normalize_hop(hop: &str) -> String {
    if let Ok(ip) = hop.parse::<IpAddr>() {
        return ip.to_string();
    }
    if let Ok(addr) = hop.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    hop.to_string()
}

/// `"<OS>-<Browser>"`, e.g. `macOS-Safari`. Anything the parser cannot
/// classify becomes `Unknown`.
pub fn device_from_user_agent(ua: &str) -> Device {
    let parsed = Parser::new().parse(ua);
    let (os, browser) = match &parsed {
        Some(result) => {
            let os: &str = &result.os;
            let name: &str = &result.name;
            (os_label(os), known(name))
        }
        None => (UNKNOWN, UNKNOWN),
    };
    Device::new(format!("{os}-{browser}"))
}

fn os_label(os: &str) -> &str {
    match os {
        "Mac OSX" => "macOS",
        "iPhone" | "iPad" | "iPod" => "iOS",
        os if os.starts_with("Windows") => "Windows",
        os => known(os),
    }
}

fn known(label: &str) -> &str {
    if label.is_empty() || label == PARSER_UNKNOWN {
        UNKNOWN
    } else {
        label
    }
}
