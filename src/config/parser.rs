//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
#[cfg(test)]
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_full_config() {
        let config = load_config_str(
            r#"
            discord {
              token = "abc"
              channel = 1234567890
            }
            servers = ["203.0.113.5:27015", "play.example.com"]
            query {
              interval = 60
              timeout = 2000
              players = true
            }
            display {
              title = "My Servers"
              style = "detailed"
              only = ["play.example.com"]
            }
            publish {
              max_retries = 5
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.channel, 1234567890);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.query.interval, Some(60));
        assert_eq!(config.query.players, Some(true));
        assert_eq!(config.query.cycle_timeout, None);
        assert_eq!(config.display.style.as_deref(), Some("detailed"));
        assert_eq!(config.display.only, Some(vec!["play.example.com".to_string()]));
        assert_eq!(config.publish.max_retries, Some(5));
    }

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_str(
            r#"
            discord { token = "abc", channel = 1 }
            servers = ["127.0.0.1"]
            "#,
        )
        .unwrap();

        assert!(config.display.title.is_none());
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/ssdb.conf");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
