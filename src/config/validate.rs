//! Configuration validation.
//!
//! Checks every value, collects all problems into one error, and turns a
//! parsed [`Config`] into [`Settings`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::error::ConfigError;
use crate::common::ServerAddress;
use crate::config::types::*;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Discord edits are rate limited per channel; faster polling only burns budget.
const MIN_INTERVAL_SECS: u64 = 5;

/// Validate a configuration and build the settings the bot runs on.
pub fn validate_config(config: &Config) -> Result<Settings, ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.channel == 0 {
        errors.push("discord.channel must be non-zero".to_string());
    }

    // Servers
    let mut servers = Vec::with_capacity(config.servers.len());
    let mut seen = HashSet::new();
    for (i, entry) in config.servers.iter().enumerate() {
        match entry.parse::<ServerAddress>() {
            Ok(address) => {
                if !seen.insert(address.clone()) {
                    errors.push(format!("servers[{}] '{}' is listed twice", i, entry));
                } else {
                    servers.push(address);
                }
            }
            Err(e) => errors.push(format!("servers[{}] '{}' is invalid: {}", i, entry, e)),
        }
    }
    if config.servers.is_empty() {
        errors.push("servers is empty - nothing to query".to_string());
    }

    // Query
    let query = &config.query;
    let interval = query.interval.unwrap_or(DEFAULT_INTERVAL_SECS);
    if interval < MIN_INTERVAL_SECS {
        errors.push(format!(
            "query.interval must be at least {} seconds (got {})",
            MIN_INTERVAL_SECS, interval
        ));
    }
    let timeout = query.timeout.unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout == 0 {
        errors.push("query.timeout must be non-zero".to_string());
    }
    let cycle_timeout = query.cycle_timeout.unwrap_or(DEFAULT_CYCLE_TIMEOUT_MS.max(timeout));
    if cycle_timeout < timeout {
        errors.push(format!(
            "query.cycle_timeout ({} ms) must not be shorter than query.timeout ({} ms)",
            cycle_timeout, timeout
        ));
    }
    let concurrency = query.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        errors.push("query.concurrency must be at least 1".to_string());
    }

    let poll = PollSettings {
        interval: Duration::from_secs(interval),
        server_timeout: Duration::from_millis(timeout),
        cycle_timeout: Duration::from_millis(cycle_timeout),
        concurrency,
        query_players: query.players.unwrap_or(false),
    };

    let display = validate_display(&config.display, &servers, poll.interval, &mut errors);
    let publish = validate_publish(&config.publish, &mut errors);

    let log_level = config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "info".to_string())
        .to_lowercase();
    if !VALID_LOG_LEVELS.contains(&log_level.as_str()) {
        errors.push(format!(
            "logging.level '{}' is invalid (use: {})",
            log_level,
            VALID_LOG_LEVELS.join(", ")
        ));
    }

    if !errors.is_empty() {
        return Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        });
    }

    Ok(Settings {
        token: config.discord.token.clone(),
        channel_id: config.discord.channel,
        servers,
        poll,
        display,
        publish,
        log_level,
    })
}

fn validate_display(
    options: &DisplayOptions,
    servers: &[ServerAddress],
    interval: Duration,
    errors: &mut Vec<String>,
) -> DisplayConfig {
    let mut display = DisplayConfig {
        interval,
        ..DisplayConfig::default()
    };

    if let Some(ref title) = options.title {
        display.title = title.clone();
    }

    if let Some(ref color) = options.color {
        match parse_color(color) {
            Ok(color) => display.color = Some(color),
            Err(e) => errors.push(format!("display.color {}", e)),
        }
    }

    if let Some(ref style) = options.style {
        match style.parse() {
            Ok(style) => display.style = style,
            Err(e) => errors.push(format!("display.style {}", e)),
        }
    }

    if let Some(ref order) = options.order {
        match order.parse() {
            Ok(order) => display.order = order,
            Err(e) => errors.push(format!("display.order {}", e)),
        }
    }

    match options.connect.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("steam") => display.connect = ConnectStyle::Steam,
        Some("none") => display.connect = ConnectStyle::None,
        Some("website") => match options.connect_url {
            Some(ref url) if url.contains("%address") => {
                display.connect = ConnectStyle::Website(url.clone());
            }
            Some(_) => errors.push("display.connect_url must contain %address".to_string()),
            None => errors.push("display.connect_url is required when display.connect is 'website'".to_string()),
        },
        Some(other) => errors.push(format!(
            "display.connect '{}' is invalid (use: steam, website, none)",
            other
        )),
    }

    if let Some(max) = options.max {
        if max == 0 || max > MAX_EMBED_SERVERS {
            errors.push(format!(
                "display.max must be between 1 and {} (got {})",
                MAX_EMBED_SERVERS, max
            ));
        } else {
            display.max = max;
        }
    }

    display.count_bots = options.count_bots.unwrap_or(false);

    for (i, entry) in options.only.iter().flatten().enumerate() {
        match entry.parse::<ServerAddress>() {
            Ok(address) if servers.contains(&address) => display.only.push(address),
            Ok(_) => errors.push(format!("display.only[{}] '{}' is not in servers", i, entry)),
            Err(e) => errors.push(format!("display.only[{}] '{}' is invalid: {}", i, entry, e)),
        }
    }

    if let Some(ref format) = options.upper_format {
        display.upper_format = format.clone();
    }
    if let Some(ref format) = options.lower_format {
        display.lower_format = format.clone();
    }
    if display.upper_format.trim().is_empty() || display.lower_format.trim().is_empty() {
        errors.push("display.upper_format and display.lower_format must not be empty".to_string());
    }

    display
}

fn validate_publish(options: &PublishConfig, errors: &mut Vec<String>) -> PublishSettings {
    let defaults = PublishSettings::default();

    let min_backoff = options
        .min_backoff
        .map(Duration::from_millis)
        .unwrap_or(defaults.min_backoff);
    let max_backoff = options
        .max_backoff
        .map(Duration::from_millis)
        .unwrap_or(defaults.max_backoff);
    if min_backoff > max_backoff {
        errors.push(format!(
            "publish.min_backoff ({:?}) must not exceed publish.max_backoff ({:?})",
            min_backoff, max_backoff
        ));
    }

    let state_file = match options.state_file.as_deref() {
        None => defaults.state_file,
        Some("") => None,
        Some(path) => Some(PathBuf::from(path)),
    };

    PublishSettings {
        max_retries: options.max_retries.unwrap_or(defaults.max_retries),
        min_backoff,
        max_backoff,
        state_file,
    }
}

/// Quick check if config has the minimum required fields populated.
pub fn has_required_fields(config: &Config) -> bool {
    !config.discord.token.is_empty() && config.discord.channel != 0 && !config.servers.is_empty()
}
