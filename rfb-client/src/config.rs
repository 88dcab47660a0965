//! Configuration for capture sessions.

use crate::errors::RfbError;
use rfb_protocol::messages::types::{
    ENCODING_CORRE, ENCODING_COPY_RECT, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE,
    ENCODING_ZRLE, PSEUDO_ENCODING_CURSOR, PSEUDO_ENCODING_DESKTOP_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Recording settings.
    #[serde(default)]
    pub recording: RecordingConfig,
    /// Reconnection settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    #[serde(default = "default_port")]
    pub port: u16,
    /// VNC password (if required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Request a shared session.
    #[serde(default)]
    pub shared: bool,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> u16 {
    5900
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Preferred encodings in priority order.
    #[serde(default = "default_encodings")]
    pub encodings: Vec<i32>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
        }
    }
}

fn default_encodings() -> Vec<i32> {
    vec![
        ENCODING_ZRLE,
        ENCODING_HEXTILE,
        ENCODING_CORRE,
        ENCODING_RRE,
        ENCODING_COPY_RECT,
        ENCODING_RAW,
        PSEUDO_ENCODING_CURSOR,
        PSEUDO_ENCODING_DESKTOP_SIZE,
    ]
}

/// Recording configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Path or name of the ffmpeg executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    /// H.264 constant rate factor.
    #[serde(default = "default_crf")]
    pub crf: u32,
    /// libx264 preset name.
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Frame size used when recording is armed before the first update.
    #[serde(default = "default_width")]
    pub default_width: u32,
    #[serde(default = "default_height")]
    pub default_height: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            crf: default_crf(),
            preset: default_preset(),
            default_width: default_width(),
            default_height: default_height(),
        }
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

/// Reconnection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect after losing an established connection.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum number of consecutive failed reconnect attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                host: String::new(),
                port: default_port(),
                password: None,
                shared: false,
                timeout_ms: default_timeout_ms(),
            },
            display: DisplayConfig::default(),
            recording: RecordingConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RfbError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RfbError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| RfbError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), RfbError> {
        if self.connection.host.is_empty() {
            return Err(RfbError::Config("host cannot be empty".to_string()));
        }
        if self.connection.port == 0 {
            return Err(RfbError::Config("port cannot be 0".to_string()));
        }
        if self.display.encodings.is_empty() {
            return Err(RfbError::Config(
                "at least one encoding must be enabled".to_string(),
            ));
        }
        if self.recording.default_width == 0 || self.recording.default_height == 0 {
            return Err(RfbError::Config(
                "default frame size cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the connection timeout duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }
}

/// Builder for creating a [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the server hostname or IP address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the VNC password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Requests a shared session.
    pub fn shared(mut self, shared: bool) -> Self {
        self.config.connection.shared = shared;
        self
    }

    /// Sets the default recording folder-independent frame size.
    pub fn default_frame_size(mut self, width: u32, height: u32) -> Self {
        self.config.recording.default_width = width;
        self.config.recording.default_height = height;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<Config, RfbError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .host("localhost")
            .port(5901)
            .password("hunter2")
            .shared(true)
            .build()
            .unwrap();

        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 5901);
        assert_eq!(config.connection.password.as_deref(), Some("hunter2"));
        assert!(config.connection.shared);
    }

    #[test]
    fn test_validation_rejects_empty_host() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut config = Config::default();
        config.connection.host = "localhost".to_string();
        config.connection.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let raw = r#"
            [connection]
            host = "vnc.example.org"
            password = "secret"

            [recording]
            crf = 18
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.connection.host, "vnc.example.org");
        assert_eq!(config.connection.port, 5900); // default
        assert_eq!(config.recording.crf, 18);
        assert_eq!(config.recording.preset, "veryfast"); // default
        assert!(config.reconnect.enabled);
    }

    #[test]
    fn test_default_encodings_cover_all_decoders() {
        let encodings = default_encodings();
        for required in [
            ENCODING_RAW,
            ENCODING_COPY_RECT,
            ENCODING_RRE,
            ENCODING_CORRE,
            ENCODING_HEXTILE,
            ENCODING_ZRLE,
            PSEUDO_ENCODING_CURSOR,
            PSEUDO_ENCODING_DESKTOP_SIZE,
        ] {
            assert!(encodings.contains(&required));
        }
    }
}
