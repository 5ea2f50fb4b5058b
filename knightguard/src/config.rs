use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::engine::poller::{COLOR_SETUP_MAX_TICKS, JOIN_SETUP_MAX_TICKS, MEMBER_REQUEST_DELAY_TICKS};
use crate::engine::view_model::DEFAULT_MAX_VISIBLE;

/// Top-level configuration, loaded from knightguard.toml.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KnightConfig {
    pub channel: ChannelSection,
    pub view: ViewSection,
    pub pollers: PollerSection,
    pub database: DatabaseSection,
    pub host: HostSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// The one managed chat channel.
    pub name: String,
    /// Display color applied once the channel is registered (`rrggbb`).
    pub color: String,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            name: "KnightGuard".into(),
            color: "ff8040".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewSection {
    pub max_visible: usize,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            max_visible: DEFAULT_MAX_VISIBLE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerSection {
    pub color_setup_max_ticks: u32,
    pub join_setup_max_ticks: u32,
    pub member_request_delay_ticks: u32,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            color_setup_max_ticks: COLOR_SETUP_MAX_TICKS,
            join_setup_max_ticks: JOIN_SETUP_MAX_TICKS,
            member_request_delay_ticks: MEMBER_REQUEST_DELAY_TICKS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:knightguard.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Scheduler ticks per second. Only the tick count matters to the engine.
    pub tick_rate_hz: u32,
}

impl Default for HostSection {
    fn default() -> Self {
        Self { tick_rate_hz: 50 }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, source: std::io::Error },
    Parse { path: String, source: toml::de::Error },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config file {path}: {source}")
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config file {path}: {source}")
            }
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl KnightConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
            Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("KG_CHANNEL") {
            self.channel.name = v;
        }
        if let Ok(v) = std::env::var("KG_CHANNEL_COLOR") {
            self.channel.color = v;
        }
        if let Ok(v) = std::env::var("KG_MAX_VISIBLE")
            && let Ok(n) = v.parse()
        {
            self.view.max_visible = n;
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = std::env::var("KG_TICK_RATE_HZ")
            && let Ok(hz) = v.parse()
        {
            self.host.tick_rate_hz = hz;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.name.trim().is_empty() {
            return Err(ConfigError::Invalid("channel.name cannot be empty".into()));
        }
        let color = &self.channel.color;
        if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::Invalid(format!(
                "channel.color must be six hex digits, got {color:?}"
            )));
        }
        if self.view.max_visible == 0 {
            return Err(ConfigError::Invalid("view.max_visible must be at least 1".into()));
        }
        if self.host.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("host.tick_rate_hz must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KnightConfig::default();
        assert_eq!(config.channel.name, "KnightGuard");
        assert_eq!(config.view.max_visible, DEFAULT_MAX_VISIBLE);
        assert_eq!(config.pollers.color_setup_max_ticks, 20);
        assert_eq!(config.pollers.join_setup_max_ticks, 60);
        assert_eq!(config.pollers.member_request_delay_ticks, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = KnightConfig::from_toml_str(
            r#"
            [channel]
            name = "Wardens"

            [view]
            max_visible = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.channel.name, "Wardens");
        assert_eq!(config.channel.color, "ff8040");
        assert_eq!(config.view.max_visible, 8);
        assert_eq!(config.host.tick_rate_hz, 50);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let mut config = KnightConfig::default();
        config.channel.color = "orange".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_channel_rejected() {
        let mut config = KnightConfig::default();
        config.channel.name = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rows_rejected() {
        let mut config = KnightConfig::default();
        config.view.max_visible = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(KnightConfig::from_toml_str("[channel\nname=").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = KnightConfig::load("/nonexistent/knightguard.toml").unwrap();
        assert!(!config.channel.name.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::Invalid("bad".into());
        assert_eq!(format!("{err}"), "invalid configuration: bad");
    }
}
