//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub serial: SerialConfig,
    pub telemetry: TelemetryConfig,
    pub video: VideoConfig,
    pub record: RecordConfig,
    pub report: ReportConfig,
}

/// Ground station link configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkConfig {
    /// Ground station address the downlink streams to
    pub target_ip: String,
    /// UDP port for video packets
    pub video_port: u16,
    /// UDP port for batched telemetry (and inbound uplink)
    pub telemetry_port: u16,
    /// UDP port for the periodic status record
    pub status_port: u16,
}

/// Flight controller serial port configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
}

/// Telemetry batching configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Queued payload bytes above which a batch flush is due
    pub flush_bytes: usize,
    /// Message id that forces an immediate flush
    pub urgent_msg_id: u8,
    /// Batch FIFO capacity in messages
    pub fifo_messages: usize,
}

/// Video packetizer configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VideoConfig {
    /// Largest packet payload (the datagram adds a 4-byte header)
    pub max_payload: usize,
    /// Transmit FIFO bound in datagram bytes
    pub tx_fifo_bytes: usize,
    /// Packetizer collection buffer size
    pub max_unit_bytes: usize,
}

/// Local recording configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RecordConfig {
    pub enabled: bool,
    /// Output path prefix; files are `<path><N>.h264`
    pub path: String,
    /// Rotation threshold; on FAT32 cards 2000 is the practical maximum
    pub max_file_size_mb: u64,
}

/// Status reporting configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub interval_s: u64,
}

// Default value functions
fn default_target_ip() -> String { "127.0.0.1".to_string() }
fn default_video_port() -> u16 { 7000 }
fn default_telemetry_port() -> u16 { 8000 }
fn default_status_port() -> u16 { 5200 }

fn default_serial_device() -> String { "/dev/serial0".to_string() }
fn default_baud_rate() -> u32 { 57600 }

fn default_flush_bytes() -> usize { 1400 }
fn default_urgent_msg_id() -> u8 { 30 }
fn default_fifo_messages() -> usize { 64 }

fn default_max_payload() -> usize { 1400 }
fn default_tx_fifo_bytes() -> usize { 256 * 1024 }
fn default_max_unit_bytes() -> usize { 1024 * 1024 }

fn default_record_path() -> String { "record".to_string() }
fn default_max_file_size_mb() -> u64 { 2000 }

fn default_report_interval_s() -> u64 { 1 }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            target_ip: default_target_ip(),
            video_port: default_video_port(),
            telemetry_port: default_telemetry_port(),
            status_port: default_status_port(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_serial_device(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            flush_bytes: default_flush_bytes(),
            urgent_msg_id: default_urgent_msg_id(),
            fifo_messages: default_fifo_messages(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_payload: default_max_payload(),
            tx_fifo_bytes: default_tx_fifo_bytes(),
            max_unit_bytes: default_max_unit_bytes(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_record_path(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_s: default_report_interval_s(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            serial: SerialConfig::default(),
            telemetry: TelemetryConfig::default(),
            video: VideoConfig::default(),
            record: RecordConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.link.target_ip.is_empty() {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("link target_ip cannot be empty"),
            ));
        }

        if self.link.video_port == 0 || self.link.telemetry_port == 0 || self.link.status_port == 0
        {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("link ports must be non-zero"),
            ));
        }

        if self.serial.device.is_empty() {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("serial device cannot be empty"),
            ));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600]
            .contains(&self.serial.baud_rate)
        {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom(
                    "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
                ),
            ));
        }

        if self.telemetry.flush_bytes == 0 || self.telemetry.flush_bytes > 65000 {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("flush_bytes must be between 1 and 65000"),
            ));
        }

        if self.telemetry.fifo_messages == 0 {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("fifo_messages must be greater than 0"),
            ));
        }

        if self.video.max_payload < 64 || self.video.max_payload > 65000 {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("max_payload must be between 64 and 65000"),
            ));
        }

        if self.video.tx_fifo_bytes < self.video.max_payload + 4 {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("tx_fifo_bytes must hold at least one full datagram"),
            ));
        }

        if self.video.max_unit_bytes < self.video.max_payload {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("max_unit_bytes must be at least max_payload"),
            ));
        }

        if self.record.enabled && self.record.path.is_empty() {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("record path cannot be empty when enabled"),
            ));
        }

        if self.record.max_file_size_mb == 0 {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("max_file_size_mb must be greater than 0"),
            ));
        }

        if self.report.interval_s == 0 || self.report.interval_s > 3600 {
            return Err(crate::error::DownlinkError::Config(
                toml::de::Error::custom("report interval_s must be between 1 and 3600"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.telemetry.flush_bytes, 1400);
        assert_eq!(config.telemetry.urgent_msg_id, 30);
        assert_eq!(config.video.max_payload, 1400);
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.report.interval_s, 1);
        assert!(!config.record.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[link]
target_ip = "192.168.2.20"
video_port = 7100

[serial]
device = "/dev/ttyAMA0"

[telemetry]
flush_bytes = 1200
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.link.target_ip, "192.168.2.20");
        assert_eq!(config.link.video_port, 7100);
        assert_eq!(config.link.telemetry_port, 8000, "unset fields keep defaults");
        assert_eq!(config.serial.device, "/dev/ttyAMA0");
        assert_eq!(config.telemetry.flush_bytes, 1200);
    }

    #[test]
    fn test_empty_target_ip() {
        let mut config = Config::default();
        config.link.target_ip = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = Config::default();
        config.link.video_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_device() {
        let mut config = Config::default();
        config.serial.device = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 12345;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[9600, 57600, 115200, 921600] {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_flush_bytes_bounds() {
        let mut config = Config::default();
        config.telemetry.flush_bytes = 0;
        assert!(config.validate().is_err());

        config.telemetry.flush_bytes = 65001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fifo_messages_zero() {
        let mut config = Config::default();
        config.telemetry.fifo_messages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_payload_bounds() {
        let mut config = Config::default();
        config.video.max_payload = 63;
        assert!(config.validate().is_err());

        config.video.max_payload = 65001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tx_fifo_too_small() {
        let mut config = Config::default();
        config.video.tx_fifo_bytes = config.video.max_payload; // missing header room
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_unit_below_payload() {
        let mut config = Config::default();
        config.video.max_unit_bytes = config.video.max_payload - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_record_path_empty_when_enabled() {
        let mut config = Config::default();
        config.record.enabled = true;
        config.record.path = String::new();
        assert!(config.validate().is_err());

        config.record.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_report_interval_bounds() {
        let mut config = Config::default();
        config.report.interval_s = 0;
        assert!(config.validate().is_err());

        config.report.interval_s = 3601;
        assert!(config.validate().is_err());
    }
}
