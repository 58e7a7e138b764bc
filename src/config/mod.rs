//! Configuration management for segmentd.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::MAX_SEGMENT_ID;
use crate::{TCP_COMMAND_PORT, UDP_COMMAND_PORT};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Segment identity.
    #[serde(default)]
    pub segment: SegmentConfig,

    /// Command-server network settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Telemetry pacing.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.segment.id > MAX_SEGMENT_ID {
            return Err(Error::InvalidConfig(format!(
                "segment id {} out of range (0-{MAX_SEGMENT_ID})",
                self.segment.id
            )));
        }

        if self.network.tcp_port == self.network.udp_port {
            return Err(Error::InvalidConfig(
                "TCP and UDP command ports must differ".into(),
            ));
        }

        if self.telemetry.motor_state_interval.is_zero()
            || self.telemetry.diagnostics_interval.is_zero()
        {
            return Err(Error::InvalidConfig(
                "telemetry intervals must be non-zero".into(),
            ));
        }

        Ok(())
    }

    /// Get default config path.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("io", "segmentd", "segmentd").map_or_else(
            || PathBuf::from("segmentd.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Create example configuration.
    pub fn example() -> Self {
        Self {
            segment: SegmentConfig { id: 1 },
            ..Default::default()
        }
    }
}

/// Segment identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Segment id, 1-8 once commissioned; 0 means unconfigured.
    #[serde(default)]
    pub id: u8,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self { id: 0 }
    }
}

/// Command-server network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address both servers bind on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// Stream command port.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Datagram command port.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// Socket send buffer size in bytes.
    #[serde(default = "default_send_buffer")]
    pub send_buffer_size: usize,

    /// Socket receive buffer size in bytes.
    #[serde(default = "default_recv_buffer")]
    pub recv_buffer_size: usize,
}

fn default_bind_addr() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}
fn default_tcp_port() -> u16 {
    TCP_COMMAND_PORT
}
fn default_udp_port() -> u16 {
    UDP_COMMAND_PORT
}
fn default_send_buffer() -> usize {
    256 * 1024
}
fn default_recv_buffer() -> usize {
    256 * 1024
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            send_buffer_size: default_send_buffer(),
            recv_buffer_size: default_recv_buffer(),
        }
    }
}

/// Telemetry pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Motor-state frame interval (100 Hz nominal).
    #[serde(default = "default_motor_state_interval", with = "humantime_serde")]
    pub motor_state_interval: Duration,

    /// Diagnostics frame interval (1 Hz nominal).
    #[serde(default = "default_diagnostics_interval", with = "humantime_serde")]
    pub diagnostics_interval: Duration,
}

fn default_motor_state_interval() -> Duration {
    Duration::from_millis(10)
}
fn default_diagnostics_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            motor_state_interval: default_motor_state_interval(),
            diagnostics_interval: default_diagnostics_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text or json).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable colored output.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_color(),
        }
    }
}

/// Initialize logging.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(config.color))
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.segment.id, 0);
        assert_eq!(config.network.tcp_port, 5000);
        assert_eq!(config.network.udp_port, 6000);
        assert_eq!(
            config.telemetry.motor_state_interval,
            Duration::from_millis(10)
        );
        assert_eq!(config.telemetry.diagnostics_interval, Duration::from_secs(1));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_segment_id() {
        let mut config = Config::default();
        config.segment.id = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_port_clash() {
        let mut config = Config::default();
        config.network.udp_port = config.network.tcp_port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segmentd.toml");

        let mut config = Config::example();
        config.segment.id = 4;
        config.telemetry.diagnostics_interval = Duration::from_secs(5);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.segment.id, 4);
        assert_eq!(loaded.telemetry.diagnostics_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[segment]\nid = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.segment.id, 2);
        assert_eq!(config.network.tcp_port, 5000);
    }
}
