//! Shared types used across the application.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::common::error::AddressParseError;

/// Default A2S query port of Source engine servers.
pub const DEFAULT_QUERY_PORT: u16 = 27015;

/// A configured query target.
///
/// Immutable once parsed; used as the key for all per-server state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` using another port, bracketing IPv6 literals.
    pub fn with_port(&self, port: u16) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, port)
        } else {
            format!("{}:{}", self.host, port)
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.with_port(self.port))
    }
}

impl FromStr for ServerAddress {
    type Err = AddressParseError;

    /// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressParseError::Empty);
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let end = rest
                .find(']')
                .ok_or_else(|| AddressParseError::UnterminatedIpv6(s.to_string()))?;
            let host = &rest[..end];
            let port = match rest[end + 1..].strip_prefix(':') {
                Some(port) => Some(port),
                None if rest[end + 1..].is_empty() => None,
                None => return Err(AddressParseError::InvalidPort(rest[end + 1..].to_string())),
            };
            (host, port)
        } else if s.matches(':').count() > 1 {
            // Bare IPv6 literal without brackets carries no port.
            (s, None)
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(AddressParseError::Empty);
        }

        let port = match port {
            Some(port) => match port.trim().parse::<u16>() {
                Ok(0) | Err(_) => return Err(AddressParseError::InvalidPort(port.to_string())),
                Ok(port) => port,
            },
            None => DEFAULT_QUERY_PORT,
        };

        Ok(Self::new(host, port))
    }
}

/// Why a server could not be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No reply within the allotted time.
    Timeout,
    /// The reply was malformed or truncated.
    Protocol(String),
    /// Resolution or socket-level failure (unreachable, refused).
    Network(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::Protocol(detail) => write!(f, "protocol error: {}", detail),
            Self::Network(detail) => write!(f, "network error: {}", detail),
        }
    }
}

/// Gameplay data reported by a reachable server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    /// Port players connect to. Differs from the query port on some hosts.
    pub game_port: u16,
    pub latency: Duration,
    /// Present only when player lists are queried and the exchange succeeded.
    pub player_names: Option<Vec<String>>,
}

impl ServerInfo {
    /// Human players, i.e. the reported count minus bots.
    pub fn humans(&self) -> u8 {
        self.players.saturating_sub(self.bots)
    }
}

/// Reachability of a server at query time.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerState {
    Online(ServerInfo),
    Offline(FailureReason),
}

/// Result of querying one server at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub address: ServerAddress,
    pub queried_at: DateTime<Utc>,
    pub state: ServerState,
}

impl ServerStatus {
    pub fn online(address: ServerAddress, info: ServerInfo) -> Self {
        Self {
            address,
            queried_at: Utc::now(),
            state: ServerState::Online(info),
        }
    }

    pub fn offline(address: ServerAddress, reason: FailureReason) -> Self {
        Self {
            address,
            queried_at: Utc::now(),
            state: ServerState::Offline(reason),
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self.state, ServerState::Online(_))
    }

    pub fn info(&self) -> Option<&ServerInfo> {
        match &self.state {
            ServerState::Online(info) => Some(info),
            ServerState::Offline(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            ServerState::Online(_) => None,
            ServerState::Offline(reason) => Some(reason),
        }
    }
}

/// All server statuses gathered during one poll cycle, in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub servers: Vec<ServerStatus>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>, servers: Vec<ServerStatus>) -> Self {
        Self { taken_at, servers }
    }

    pub fn online_count(&self) -> usize {
        self.servers.iter().filter(|s| s.is_reachable()).count()
    }

    pub fn offline_count(&self) -> usize {
        self.servers.len() - self.online_count()
    }
}

/// The single chat message kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrackedMessage {
    pub channel_id: u64,
    pub message_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let addr: ServerAddress = "203.0.113.5:27016".parse().unwrap();
        assert_eq!(addr.host(), "203.0.113.5");
        assert_eq!(addr.port(), 27016);
        assert_eq!(addr.to_string(), "203.0.113.5:27016");
    }

    #[test]
    fn test_parse_default_port() {
        let addr: ServerAddress = "play.example.com".parse().unwrap();
        assert_eq!(addr.port(), DEFAULT_QUERY_PORT);
    }

    #[test]
    fn test_parse_ipv6() {
        let addr: ServerAddress = "[2001:db8::1]:27020".parse().unwrap();
        assert_eq!(addr.host(), "2001:db8::1");
        assert_eq!(addr.port(), 27020);
        assert_eq!(addr.to_string(), "[2001:db8::1]:27020");

        let bare: ServerAddress = "2001:db8::1".parse().unwrap();
        assert_eq!(bare.port(), DEFAULT_QUERY_PORT);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!("".parse::<ServerAddress>(), Err(AddressParseError::Empty));
        assert_eq!(":27015".parse::<ServerAddress>(), Err(AddressParseError::Empty));
        assert!(matches!(
            "host:abc".parse::<ServerAddress>(),
            Err(AddressParseError::InvalidPort(_))
        ));
        assert!(matches!(
            "host:0".parse::<ServerAddress>(),
            Err(AddressParseError::InvalidPort(_))
        ));
        assert!(matches!(
            "[::1:27015".parse::<ServerAddress>(),
            Err(AddressParseError::UnterminatedIpv6(_))
        ));
    }

    #[test]
    fn test_offline_status_has_no_info() {
        let status = ServerStatus::offline(
            ServerAddress::new("127.0.0.1", 27015),
            FailureReason::Timeout,
        );
        assert!(!status.is_reachable());
        assert!(status.info().is_none());
        assert_eq!(status.failure(), Some(&FailureReason::Timeout));
    }

    #[test]
    fn test_humans_excludes_bots() {
        let info = ServerInfo {
            name: String::new(),
            map: String::new(),
            folder: String::new(),
            game: String::new(),
            players: 5,
            max_players: 32,
            bots: 7,
            game_port: 27015,
            latency: Duration::ZERO,
            player_names: None,
        };
        assert_eq!(info.humans(), 0);
    }
}
