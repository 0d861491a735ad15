use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use pasty_core::NetworkField;
use serde::{Deserialize, Serialize};

/// Sub-protocol a client must offer during the WebSocket handshake.
pub const DEFAULT_SUBPROTOCOL: &str = "pastytextProtocol";

/// How long a session waits for a frame before re-polling.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Per-recipient bound on one outbound snapshot send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// `0` binds an ephemeral port.
    pub port: u16,
    pub subprotocol: String,
    pub idle_timeout: Duration,
    pub send_timeout: Duration,
    /// Directory served for paths no route matches. `None` disables it.
    pub web_dir: Option<PathBuf>,
    /// Whether snapshots carry each paste's `network` field.
    pub network_field: NetworkField,
    /// Take the group from `X-Forwarded-For` when a proxy supplies it.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            subprotocol: DEFAULT_SUBPROTOCOL.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            web_dir: Some(PathBuf::from("web")),
            network_field: NetworkField::Include,
            trust_forwarded_for: true,
        }
    }
}
