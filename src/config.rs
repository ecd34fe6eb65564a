use crate::machine::MachineConfig;
use crate::machine::sampling::{SamplingConfig, TimeoutPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_UPLOAD_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    pub seats: SeatsSection,
    #[serde(default)]
    pub hardware: Option<HardwareSection>,
    #[serde(default)]
    pub scan: Option<ScanSection>,
    #[serde(default)]
    pub upload: Option<UploadSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
    /// Node identifier reported to the collector.
    pub node_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeatsSection {
    pub total: u8,
    pub angle_per_seat_deg: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HardwareSection {
    /// GPIO pin carrying the sonar's pulse-width output
    pub sonar_pin: u8,
    /// Hardware PWM channel driving the scan servo (0 or 1)
    pub servo_pwm_channel: u8,
    /// One indicator output per seat, in seat order
    pub seat_led_pins: Vec<u8>,
    /// Scanning-in-progress indicator, if wired
    pub scan_led_pin: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanSection {
    pub interval_secs: Option<u64>,
    pub occupancy_delta_cm: Option<f32>,
    pub min_clearance_cm: Option<f32>,
    pub calibration_samples: Option<u8>,
    pub scan_samples: Option<u8>,
    pub settle_delay_ms: Option<u64>,
    pub sample_delay_ms: Option<u64>,
    pub seat_delay_ms: Option<u64>,
    pub timeout_policy: Option<TimeoutPolicy>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadSection {
    /// Collector endpoint; uploads are skipped entirely when unset.
    pub endpoint: Option<String>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Machine settings assembled from the `[seats]` and `[scan]` sections,
    /// with deployment defaults for everything the file leaves out.
    pub fn machine_config(&self) -> MachineConfig {
        let defaults = MachineConfig::default();
        let sampling_defaults = SamplingConfig::default();
        let scan = self.scan.as_ref();
        MachineConfig {
            total_seats: self.seats.total,
            angle_per_seat_deg: self.seats.angle_per_seat_deg,
            scan_interval: Duration::from_secs(
                scan.and_then(|s| s.interval_secs)
                    .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS),
            ),
            min_clearance_cm: scan
                .and_then(|s| s.min_clearance_cm)
                .unwrap_or(defaults.min_clearance_cm),
            occupancy_delta_cm: scan
                .and_then(|s| s.occupancy_delta_cm)
                .unwrap_or(defaults.occupancy_delta_cm),
            sampling: SamplingConfig {
                calibration_samples: scan
                    .and_then(|s| s.calibration_samples)
                    .unwrap_or(sampling_defaults.calibration_samples),
                scan_samples: scan
                    .and_then(|s| s.scan_samples)
                    .unwrap_or(sampling_defaults.scan_samples),
                settle_delay: scan
                    .and_then(|s| s.settle_delay_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(sampling_defaults.settle_delay),
                sample_delay: scan
                    .and_then(|s| s.sample_delay_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(sampling_defaults.sample_delay),
                seat_delay: scan
                    .and_then(|s| s.seat_delay_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(sampling_defaults.seat_delay),
                timeout_policy: scan.and_then(|s| s.timeout_policy).unwrap_or_default(),
            },
        }
    }

    /// Collector endpoint, treating an empty string as unset.
    pub fn upload_endpoint(&self) -> Option<&str> {
        let endpoint = self.upload.as_ref()?.endpoint.as_deref()?;
        if endpoint.is_empty() { None } else { Some(endpoint) }
    }

    pub fn upload_interval(&self) -> Duration {
        let secs = self
            .upload
            .as_ref()
            .and_then(|u| u.interval_secs)
            .unwrap_or(DEFAULT_UPLOAD_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        let secs = self
            .upload
            .as_ref()
            .and_then(|u| u.timeout_secs)
            .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }
}
