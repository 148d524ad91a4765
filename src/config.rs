//! Client configuration

use crate::state_machine::DEFAULT_GREETING;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

/// Longest question sent to the service, in characters. Longer input is truncated.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 512;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the conversation client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// URL the question is POSTed to
    pub endpoint: String,
    pub max_input_chars: usize,
    /// Give up on a stream after this long without an event
    pub idle_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    /// Display-only greeting; `None` to start with an empty transcript
    pub greeting: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            idle_timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

/// Invalid configuration value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let endpoint = lookup("GRAVEL_CHAT_ENDPOINT")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.endpoint);

        let max_input_chars = match parse_number(&lookup, "GRAVEL_CHAT_MAX_INPUT")? {
            Some(0) => return Err(ConfigError::Zero { var: "GRAVEL_CHAT_MAX_INPUT" }),
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => defaults.max_input_chars,
        };

        let idle_timeout = match parse_number(&lookup, "GRAVEL_CHAT_IDLE_TIMEOUT_SECS")? {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };

        let connect_timeout = parse_number(&lookup, "GRAVEL_CHAT_CONNECT_TIMEOUT_SECS")?
            .map_or(defaults.connect_timeout, Duration::from_secs);

        let greeting = match lookup("GRAVEL_CHAT_GREETING") {
            Some(s) if s.is_empty() => None,
            Some(s) => Some(s),
            None => defaults.greeting,
        };

        Ok(Self {
            endpoint,
            max_input_chars,
            idle_timeout,
            connect_timeout,
            greeting,
        })
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GRAVEL_CHAT_ENDPOINT", "http://example.test/chat"),
            ("GRAVEL_CHAT_MAX_INPUT", "64"),
            ("GRAVEL_CHAT_IDLE_TIMEOUT_SECS", "30"),
            ("GRAVEL_CHAT_CONNECT_TIMEOUT_SECS", "2"),
            ("GRAVEL_CHAT_GREETING", "Ask me anything"),
        ])
        .unwrap();

        assert_eq!(config.endpoint, "http://example.test/chat");
        assert_eq!(config.max_input_chars, 64);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.greeting.as_deref(), Some("Ask me anything"));
    }

    #[test]
    fn test_zero_idle_timeout_disables_it() {
        let config = config_from(&[("GRAVEL_CHAT_IDLE_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_empty_greeting_disables_it() {
        let config = config_from(&[("GRAVEL_CHAT_GREETING", "")]).unwrap();
        assert_eq!(config.greeting, None);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = config_from(&[("GRAVEL_CHAT_MAX_INPUT", "lots")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "GRAVEL_CHAT_MAX_INPUT",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_zero_max_input_rejected() {
        assert!(matches!(
            config_from(&[("GRAVEL_CHAT_MAX_INPUT", "0")]),
            Err(ConfigError::Zero { .. })
        ));
    }
}
