//! Shared types for the election protocol.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Prefix of the sequential peer nodes; the coordination service appends
/// the 10-digit sequence that becomes part of the peer's identity.
pub const PEER_NODE_PREFIX: &str = "peer-";

/// A process's election status, always derived, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Observing only, not contending (also the state while disconnected).
    #[default]
    Watching,
    /// Contending, but another process currently holds the leader record.
    Waiting,
    /// This process's identity is the leader record's payload.
    Leading,
}

impl ElectionStatus {
    /// String form used at the control surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watching => "WATCHING",
            Self::Waiting => "WAITING",
            Self::Leading => "LEADING",
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live state of the coordination session, gating election attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// No live session.
    #[default]
    Disconnected,
    /// Session is live; primitive calls may be issued.
    Connected,
}

impl ConnectionStatus {
    /// String form used at the control surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connected => "CONNECTED",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when the coordination session expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryPolicy {
    /// Finish the engine task with an error so a supervisor can restart the
    /// process with a clean session.
    #[default]
    FailFast,
    /// Open a fresh session in-process, re-register under a new identity,
    /// and replay the standing intent.
    SelfHeal,
}

impl ExpiryPolicy {
    /// String form used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::SelfHeal => "self-heal",
        }
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" => Ok(Self::FailFast),
            "self-heal" => Ok(Self::SelfHeal),
            other => Err(format!("unknown expiry policy '{other}' (expected 'fail-fast' or 'self-heal')")),
        }
    }
}

/// Configuration for one election participant.
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// Optional namespace prefix prepended to the peers and leader paths.
    pub namespace: Option<String>,
    /// Opaque self-description registered alongside the identity.
    pub description: String,
    /// Whether to contend for leadership immediately at startup.
    pub contend_on_start: bool,
    /// Recovery policy for session expiry.
    pub expiry_policy: ExpiryPolicy,
    /// Bounded wait for the session to reach the connected state.
    pub connect_timeout: Duration,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            description: String::new(),
            contend_on_start: true,
            expiry_policy: ExpiryPolicy::FailFast,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// The well-known paths of one election namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionPaths {
    /// Parent of the per-peer registration nodes.
    pub peers: String,
    /// The singleton leader record.
    pub leader: String,
}

impl ElectionPaths {
    /// Build the peers/leader paths for an optional namespace.
    pub fn new(namespace: Option<&str>) -> Self {
        let prefix = match namespace.map(|ns| ns.trim_matches('/')).filter(|ns| !ns.is_empty()) {
            Some(ns) => format!("/{ns}"),
            None => String::new(),
        };
        Self {
            peers: format!("{prefix}/peers"),
            leader: format!("{prefix}/leader"),
        }
    }
}

/// Point-in-time view of one participant, published by the engine loop.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Derived election status.
    pub status: ElectionStatus,
    /// Session connection status.
    pub connection: ConnectionStatus,
    /// Identity carried by the leader record, if one is known.
    pub leader: Option<String>,
    /// This process's coordination-assigned identity.
    pub my_id: Option<String>,
    /// This process's self-description.
    pub description: String,
    /// Sorted identities of the currently registered peers.
    pub peers: Vec<String>,
    /// The standing intent.
    pub wants_to_lead: bool,
}
