//! Error types for the application.

use std::time::Duration;

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-related errors.
///
/// Every variant is fatal at launch: the bot never starts half-configured.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Error raised when a `host[:port]` string cannot be turned into a server address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address is empty")]
    Empty,

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("unterminated IPv6 literal in '{0}'")]
    UnterminatedIpv6(String),
}

/// Errors raised while decoding an A2S reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Packet too short: need {needed} bytes, got {got}")]
    PacketTooShort { needed: usize, got: usize },

    #[error("Unexpected packet header: {0:#010x}")]
    UnexpectedHeader(u32),

    #[error("Unexpected response type: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("Unterminated string field")]
    UnterminatedString,

    #[error("Invalid split packet: {message}")]
    InvalidSplit { message: String },

    #[error("Compressed split replies are not supported")]
    CompressedSplit,

    #[error("Server kept issuing challenges ({0} rounds)")]
    ChallengeLoop(u8),
}

/// Chat platform failures, classified by how the publisher should react.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Platform backpressure. Retry the same payload after `retry_after`
    /// (or the configured backoff when the platform gave no duration).
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Server-side or transport hiccup worth retrying.
    #[error("Transient platform error: {message}")]
    Transient { message: String },

    /// The tracked message no longer exists.
    #[error("Tracked message is gone: {message}")]
    MessageGone { message: String },

    /// Channel missing or permissions revoked. Needs operator attention.
    #[error("Fatal platform error: {message}")]
    Fatal { message: String },
}

impl PublishError {
    /// Returns true if the same payload may be sent again within this cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }
}

/// Result type alias for packet decoding.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for chat platform operations.
pub type PublishResult<T> = std::result::Result<T, PublishError>;
