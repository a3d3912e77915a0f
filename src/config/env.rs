//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `SSDB_DISCORD_TOKEN` - Discord bot token
//! - `SSDB_DISCORD_CHANNEL` - Channel id of the status message
//! - `SSDB_SERVERS` - Comma-separated server list, replaces `servers`
//! - `SSDB_CONFIG` - Config file path

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "SSDB";

/// Apply environment variable overrides to a config.
///
/// This allows the bot token to be provided via the environment
/// instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(channel) = env::var(format!("{}_DISCORD_CHANNEL", ENV_PREFIX)) {
        if let Ok(channel) = channel.trim().parse() {
            config.discord.channel = channel;
        }
    }

    if let Ok(servers) = env::var(format!("{}_SERVERS", ENV_PREFIX)) {
        config.servers = split_list(&servers);
    }

    config
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Check if any override variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_DISCORD_TOKEN", ENV_PREFIX),
        format!("{}_DISCORD_CHANNEL", ENV_PREFIX),
        format!("{}_SERVERS", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `SSDB_CONFIG` environment variable, otherwise returns "ssdb.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "ssdb.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_test_config() -> Config {
        Config {
            discord: DiscordConfig {
                token: "original_token".to_string(),
                channel: 42,
            },
            servers: vec!["127.0.0.1:27015".to_string()],
            query: QueryConfig::default(),
            display: DisplayOptions::default(),
            publish: PublishConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "SSDB");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" a:1, ,b , c:27016"),
            vec!["a:1".to_string(), "b".to_string(), "c:27016".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        env::remove_var("SSDB_DISCORD_TOKEN");
        env::remove_var("SSDB_DISCORD_CHANNEL");
        env::remove_var("SSDB_SERVERS");

        let config = make_test_config();
        let result = apply_env_overrides(config);

        assert_eq!(result.discord.token, "original_token");
        assert_eq!(result.discord.channel, 42);
        assert_eq!(result.servers, vec!["127.0.0.1:27015".to_string()]);
    }
}
