//! Startup configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file (`SENTRY_CONFIG`, or `sentry.toml` in the working directory), then
//! `SENTRY_*` environment variables (`__` separates nested keys, e.g.
//! `SENTRY_CAMERA__FPS=15`). Everything is validated before the pipeline
//! starts; an invalid setting refuses startup.

use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use detection::scheduler::DEFAULT_FAILURE_BUDGET;
use detection::{AnchorPolicy, DetectionError, DetectionFilter, FrameScheduler};
use geofence::{GeofenceEngine, GeofenceError, Point, Zone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "sentry";
const DEFAULT_SKIP_INTERVAL: i64 = 3;
const DEFAULT_COOLDOWN_SECS: f64 = 5.0;
const DEFAULT_THRESHOLD: f32 = 0.4;
const DEFAULT_GRACE_MS: u64 = 2000;

/// Configuration errors; all are fatal at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Geofence(#[from] GeofenceError),

    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Zone polygon as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    /// Vertices are fractions of the frame size rather than pixels
    #[serde(default)]
    pub normalized: bool,
    pub vertices: Vec<[f32; 2]>,
}

/// Alarm settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub enabled: bool,
    /// Program and arguments; platform default when unset
    pub command: Option<Vec<String>>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
        }
    }
}

/// Raw configuration, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryConfig {
    /// Run inference every Kth frame
    pub skip_interval: i64,
    /// Seconds a cleared breach suppresses re-alerting
    pub cooldown_secs: f64,
    /// Allow-listed classes and their minimum confidence
    pub thresholds: BTreeMap<String, f32>,
    /// Box point tested against zones
    pub anchor: AnchorPolicy,
    /// Danger zones; the central half of the frame when empty
    pub zones: Vec<ZoneConfig>,
    /// Frame size and pacing
    pub camera: CameraConfig,
    /// Directory of images to replay; blank synthetic frames when unset
    pub source_dir: Option<PathBuf>,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// JSON detection script for the stand-in detector
    pub detector_script: Option<PathBuf>,
    /// Where evidence snapshots are written
    pub evidence_dir: PathBuf,
    pub alarm: AlarmConfig,
    /// Time allowed for alert work to finish at shutdown
    pub grace_period_ms: u64,
    /// Consecutive detector or source failures tolerated
    pub max_failures: u32,
    pub log_format: LogFormat,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            skip_interval: DEFAULT_SKIP_INTERVAL,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            thresholds: ["person", "knife", "scissors"]
                .into_iter()
                .map(|label| (label.to_string(), DEFAULT_THRESHOLD))
                .collect(),
            anchor: AnchorPolicy::default(),
            zones: Vec::new(),
            camera: CameraConfig::default(),
            source_dir: None,
            max_frames: None,
            detector_script: None,
            evidence_dir: PathBuf::from("."),
            alarm: AlarmConfig::default(),
            grace_period_ms: DEFAULT_GRACE_MS,
            max_failures: DEFAULT_FAILURE_BUDGET,
            log_format: LogFormat::default(),
        }
    }
}

/// Validated startup state
#[derive(Debug)]
pub struct SentrySettings {
    pub scheduler: FrameScheduler,
    pub filter: DetectionFilter,
    pub geofence: GeofenceEngine,
    pub cooldown: Duration,
    pub grace_period: Duration,
    pub frame_budget: Option<Duration>,
    pub max_frames: Option<u64>,
    pub max_failures: u32,
}

impl SentryConfig {
    /// Load from `SENTRY_CONFIG` (or `sentry.toml`) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SENTRY_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref(), true)
    }

    /// Load from an explicit file, optionally layering environment overrides
    pub fn load_from(path: Option<&Path>, with_env: bool) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        if with_env {
            builder = builder.add_source(
                Environment::with_prefix("SENTRY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check every setting and build the pipeline's startup state
    pub fn validate(&self) -> Result<SentrySettings, ConfigError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid {
                field: "camera",
                reason: format!("frame size {}x{}", self.camera.width, self.camera.height),
            });
        }
        let cooldown = Duration::try_from_secs_f64(self.cooldown_secs).map_err(|e| {
            ConfigError::Invalid {
                field: "cooldown_secs",
                reason: format!("{}: {}", self.cooldown_secs, e),
            }
        })?;

        let scheduler = FrameScheduler::new(self.skip_interval)?.with_failure_budget(self.max_failures);
        let filter = DetectionFilter::new(
            self.thresholds.iter().map(|(label, value)| (label.as_str(), *value)),
            self.anchor,
        )?;

        let zones = if self.zones.is_empty() {
            info!("No zones configured, using the central half of the frame");
            vec![Zone::centered(self.camera.width, self.camera.height)?]
        } else {
            self.zones
                .iter()
                .map(|zone| {
                    let vertices: Vec<Point> =
                        zone.vertices.iter().map(|[x, y]| Point::new(*x, *y)).collect();
                    if zone.normalized {
                        Zone::normalized(&zone.name, &vertices, self.camera.width, self.camera.height)
                    } else {
                        Zone::new(&zone.name, vertices)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let geofence = GeofenceEngine::new(zones)?;

        Ok(SentrySettings {
            scheduler,
            filter,
            geofence,
            cooldown,
            grace_period: Duration::from_millis(self.grace_period_ms),
            frame_budget: self.camera.frame_budget(),
            max_frames: self.max_frames,
            max_failures: self.max_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SentryConfig::default();
        let settings = config.validate().unwrap();

        assert_eq!(settings.scheduler.interval(), 3);
        assert_eq!(settings.cooldown, Duration::from_secs(5));
        assert_eq!(settings.filter.threshold("knife"), Some(0.4));
        assert_eq!(settings.geofence.zones().len(), 1);
        assert_eq!(settings.geofence.zone_name(0), Some("danger"));
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            skip_interval = 1
            cooldown_secs = 2.5
            anchor = "center"

            [thresholds]
            knife = 0.5

            [camera]
            width = 1280
            height = 720
            fps = 0

            [[zones]]
            name = "doorway"
            vertices = [[0, 0], [10, 0], [10, 10], [0, 10]]

            [[zones]]
            name = "window"
            normalized = true
            vertices = [[0.5, 0.0], [1.0, 0.0], [1.0, 0.5]]
            "#,
        );

        let config = SentryConfig::load_from(Some(file.path()), false).unwrap();
        assert_eq!(config.skip_interval, 1);
        assert_eq!(config.anchor, AnchorPolicy::Center);
        assert_eq!(config.thresholds.len(), 1);

        let settings = config.validate().unwrap();
        assert_eq!(settings.cooldown, Duration::from_millis(2500));
        assert!(settings.frame_budget.is_none());
        assert_eq!(settings.filter.threshold("person"), None);
        assert_eq!(settings.geofence.zones().len(), 2);
        assert_eq!(settings.geofence.zones()[1].vertices()[1], Point::new(1280.0, 0.0));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = SentryConfig::load_from(Some(Path::new("/nonexistent/sentry.toml")), false);
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_rejects_bad_interval() {
        let config = SentryConfig {
            skip_interval: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Detection(DetectionError::InvalidInterval(0)))
        ));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut config = SentryConfig::default();
        config.thresholds.insert("knife".to_string(), 1.2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Detection(DetectionError::InvalidThreshold { .. }))
        ));
    }

    #[test]
    fn test_rejects_degenerate_zone() {
        let config = SentryConfig {
            zones: vec![ZoneConfig {
                name: "line".to_string(),
                normalized: false,
                vertices: vec![[0.0, 0.0], [5.0, 5.0], [10.0, 10.0]],
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Geofence(GeofenceError::ZeroArea { .. }))
        ));

        let config = SentryConfig {
            zones: vec![ZoneConfig {
                name: "pair".to_string(),
                normalized: false,
                vertices: vec![[0.0, 0.0], [5.0, 5.0]],
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Geofence(GeofenceError::TooFewVertices { .. }))
        ));
    }

    #[test]
    fn test_rejects_unrepresentable_cooldown() {
        for cooldown_secs in [-1.0, f64::NAN, f64::INFINITY, 1e20] {
            let config = SentryConfig {
                cooldown_secs,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid { field: "cooldown_secs", .. })
            ));
        }
    }

    #[test]
    fn test_default_failure_budget_matches_scheduler() {
        assert_eq!(SentryConfig::default().max_failures, DEFAULT_FAILURE_BUDGET);
    }
}
