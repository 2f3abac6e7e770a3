//! Gateway configuration.
//!
//! Resolution of the default database target (env vs. CLI) happens in the
//! server binary; this module only carries the resolved values.

use serde::{Deserialize, Serialize};

/// Configuration for the gateway process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Transport type: "stdio" or "http".
    #[serde(default)]
    pub transport: Transport,

    /// HTTP bind host (only used when transport is HTTP).
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port (only used when transport is HTTP).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret required to establish streaming sessions.
    #[serde(default)]
    pub secret: Option<String>,

    /// Default database target for sessions that do not name one.
    #[serde(default)]
    pub default_database_url: Option<String>,
}

/// Gateway transport type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Line-delimited JSON-RPC on stdin/stdout (for local MCP clients).
    #[default]
    Stdio,
    /// HTTP/SSE transport.
    Http,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: default_host(),
            port: default_port(),
            secret: None,
            default_database_url: None,
        }
    }
}

impl GatewayConfig {
    pub fn is_http(&self) -> bool {
        self.transport == Transport::Http
    }

    pub fn is_stdio(&self) -> bool {
        self.transport == Transport::Stdio
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether streaming sessions are gated behind a secret.
    pub fn secret_required(&self) -> bool {
        self.secret.is_some()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
