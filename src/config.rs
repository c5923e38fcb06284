use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::activity::{FeedFormat, DEFAULT_FEED_URL, DEFAULT_THRESHOLD};
use crate::camera::{AnnotationStyle, CameraSettings, FileNaming};
use crate::controller::OnFail;
use crate::schedule::DEFAULT_SLOT_INTERVAL;
use crate::sky::Station;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid station coordinates: {0:?}")]
    Coordinates(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Everything is optional; an empty file gives the built-in Eskdalemuir
/// setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub station: StationConfig,
    pub activity: ActivityConfig,
    pub camera: CameraConfig,
    pub schedule: ScheduleConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub name: Option<String>,
    /// `"lat, lon"` in degrees.
    pub coordinates: String,
    /// Sun altitude that counts as rise/set. 0 is the geometric horizon.
    pub horizon_deg: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        let station = Station::default();
        Self {
            name: Some("Eskdalemuir".to_string()),
            coordinates: format!("{}, {}", station.latitude_deg, station.longitude_deg),
            horizon_deg: 0.0,
        }
    }
}

impl StationConfig {
    pub fn station(&self) -> Result<Station, ConfigError> {
        Station::from_coordinates(&self.coordinates)
            .ok_or_else(|| ConfigError::Coordinates(self.coordinates.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivityConfig {
    pub url: String,
    pub threshold: f64,
    #[serde(with = "crate::utils::duration_str")]
    pub timeout: Duration,
    pub format: FeedFormat,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            threshold: DEFAULT_THRESHOLD,
            timeout: Duration::from_secs(30),
            format: FeedFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub program: PathBuf,
    pub lock_path: PathBuf,
    pub settings: CameraSettings,
    pub output: FileNaming,
    /// Timestamp drawn on each image.
    pub annotation: AnnotationStyle,
    pub on_fail: OnFail,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(crate::camera::DEFAULT_PROGRAM),
            lock_path: PathBuf::from(crate::camera::DEFAULT_LOCK_PATH),
            settings: CameraSettings::default(),
            output: FileNaming::default(),
            annotation: AnnotationStyle::default(),
            on_fail: OnFail::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(with = "crate::utils::duration_str")]
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SLOT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Append-only log file; `null` logs to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("ESK_AuroraCam.log")),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as null rather than an empty map.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.station.station()?;
        if !self.station.horizon_deg.is_finite() || self.station.horizon_deg.abs() > 10.0 {
            return Err(invalid("station.horizon_deg", "must be within +-10 degrees"));
        }
        if !self.activity.threshold.is_finite() {
            return Err(invalid("activity.threshold", "must be a finite number"));
        }
        if self.activity.timeout.is_zero() {
            return Err(invalid("activity.timeout", "must be positive"));
        }
        match self.activity.format {
            FeedFormat::Columns { line_from_end: 0, .. }
            | FeedFormat::LastNumber { line_from_end: 0 } => {
                return Err(invalid("activity.format", "line_from_end must be at least 1"));
            }
            FeedFormat::Columns { start, end, .. } if start >= end => {
                return Err(invalid("activity.format", "start must be before end"));
            }
            _ => {}
        }
        if self.schedule.interval < Duration::from_secs(1) {
            return Err(invalid("schedule.interval", "must be at least 1s"));
        }
        let settings = &self.camera.settings;
        if settings.resolution.width == 0 || settings.resolution.height == 0 {
            return Err(invalid("camera.settings.resolution", "must be non-zero"));
        }
        if settings.shutter_us == 0 || settings.iso == 0 {
            return Err(invalid("camera.settings", "shutter_us and iso must be non-zero"));
        }
        if self.camera.annotation.size == 0 {
            return Err(invalid("camera.annotation.size", "must be non-zero"));
        }
        if self.camera.output.prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(invalid("camera.output.prefix", "must not contain a path separator"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
