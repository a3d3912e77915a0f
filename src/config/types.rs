//! Configuration type definitions.
//!
//! `Config` mirrors the HOCON file. `Settings` is the validated, immutable
//! form the rest of the bot runs on.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::common::ServerAddress;

pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_CYCLE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_TITLE: &str = "Servers";
pub const DEFAULT_UPPER_FORMAT: &str = "%name";
pub const DEFAULT_LOWER_FORMAT: &str = "%map | %players/%max_players | %connect";
/// Discord allows at most 25 fields per embed.
pub const MAX_EMBED_SERVERS: usize = 25;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MIN_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_STATE_FILE: &str = ".ssdb_message.json";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub display: DisplayOptions,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    /// Channel the status message lives in.
    #[serde(default)]
    pub channel: u64,
}

/// Polling settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryConfig {
    /// Seconds between cycles.
    pub interval: Option<u64>,
    /// Per-server timeout in milliseconds.
    pub timeout: Option<u64>,
    /// Overall cycle deadline in milliseconds.
    pub cycle_timeout: Option<u64>,
    pub concurrency: Option<usize>,
    /// Also fetch player names (one extra challenge exchange per server).
    pub players: Option<bool>,
}

/// Presentation settings as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayOptions {
    pub title: Option<String>,
    /// `#rrggbb`, `0xrrggbb` or a decimal number.
    pub color: Option<String>,
    /// `compact` or `detailed`.
    pub style: Option<String>,
    /// `steam`, `website` or `none`.
    pub connect: Option<String>,
    /// Link used by the `website` connect style; `%address` is substituted.
    pub connect_url: Option<String>,
    /// `config`, `players` or `name`.
    pub order: Option<String>,
    pub max: Option<usize>,
    pub count_bots: Option<bool>,
    /// Subset of `servers` to show. Empty shows everything.
    pub only: Option<Vec<String>>,
    pub upper_format: Option<String>,
    pub lower_format: Option<String>,
}

/// Publishing settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishConfig {
    pub max_retries: Option<u32>,
    /// Milliseconds.
    pub min_backoff: Option<u64>,
    /// Milliseconds.
    pub max_backoff: Option<u64>,
    /// Where the tracked message id is remembered. Empty string disables it.
    pub state_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

// ============================================================================
// Validated settings
// ============================================================================

/// Everything the bot needs, validated and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub channel_id: u64,
    pub servers: Vec<ServerAddress>,
    pub poll: PollSettings,
    pub display: DisplayConfig,
    pub publish: PublishSettings,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    pub server_timeout: Duration,
    pub cycle_timeout: Duration,
    pub concurrency: usize,
    pub query_players: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            server_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            cycle_timeout: Duration::from_millis(DEFAULT_CYCLE_TIMEOUT_MS),
            concurrency: DEFAULT_CONCURRENCY,
            query_players: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishSettings {
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub state_file: Option<PathBuf>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_backoff: Duration::from_millis(DEFAULT_MIN_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            state_file: Some(PathBuf::from(DEFAULT_STATE_FILE)),
        }
    }
}

/// How one server is laid out in the embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayStyle {
    /// One field from `upper_format` / `lower_format`.
    #[default]
    Compact,
    /// Multi-line block with map, players, connect info and names.
    Detailed,
}

impl FromStr for DisplayStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!("'{}' is invalid (use: compact, detailed)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectStyle {
    /// `steam://connect/host:port`
    #[default]
    Steam,
    /// Link template with `%address` substituted.
    Website(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerOrder {
    #[default]
    Config,
    /// Most players first, offline servers last.
    Players,
    Name,
}

impl FromStr for ServerOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "config" => Ok(Self::Config),
            "players" => Ok(Self::Players),
            "name" => Ok(Self::Name),
            other => Err(format!("'{}' is invalid (use: config, players, name)", other)),
        }
    }
}

/// Rules the renderer follows.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub title: String,
    pub color: Option<u32>,
    pub style: DisplayStyle,
    pub connect: ConnectStyle,
    pub order: ServerOrder,
    pub max: usize,
    pub count_bots: bool,
    pub only: Vec<ServerAddress>,
    pub upper_format: String,
    pub lower_format: String,
    /// Shown in the description so readers know how fresh the list is.
    pub interval: Duration,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            color: None,
            style: DisplayStyle::default(),
            connect: ConnectStyle::default(),
            order: ServerOrder::default(),
            max: MAX_EMBED_SERVERS,
            count_bots: false,
            only: Vec::new(),
            upper_format: DEFAULT_UPPER_FORMAT.to_string(),
            lower_format: DEFAULT_LOWER_FORMAT.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

/// Parse `#rrggbb`, `0xrrggbb` or a decimal colour value.
pub fn parse_color(value: &str) -> Result<u32, String> {
    let value = value.trim();
    let parsed = if let Some(hex) = value.strip_prefix('#') {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse()
    };

    match parsed {
        Ok(color) if color <= 0xFF_FFFF => Ok(color),
        Ok(color) => Err(format!("{:#x} is larger than 0xffffff", color)),
        Err(e) => Err(format!("'{}' is not a colour: {}", value, e)),
    }
}
