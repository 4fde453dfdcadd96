//! Configuration loading and schedule validation.
//!
//! The canonical configuration lives in `lastseen-config.yaml`. Every field
//! has a default, so an empty file (or no file) yields a runnable
//! configuration. The schedule section is checked by
//! [`ScheduleConfig::validate`], which reports every violated constraint at
//! once; a processor refuses to start while any violation remains.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::identity::ProcessorIdentity;

/// Format of [`ScheduleConfig::clear_cache_time`].
pub const CLEAR_CACHE_TIME_FORMAT: &str = "%H:%M:%S";

/// Errors that can occur when loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// One or more schedule constraints are violated.
    #[error("invalid schedule configuration:\n{}", Violations(.violations))]
    Invalid {
        /// Every violated constraint.
        violations: Vec<ConfigViolation>,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// A single violated schedule constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigViolation {
    /// `cycle_interval_ms` is zero or negative.
    #[error("cycle_interval_ms must be a positive integer (got {0})")]
    NonPositiveCycleInterval(i64),

    /// `message_interval_ms` is zero or negative.
    #[error("message_interval_ms must be a positive integer (got {0})")]
    NonPositiveMessageInterval(i64),

    /// `clear_cache_time` is not `HH:MM:SS`.
    #[error("clear_cache_time must be HH:MM:SS (got {0:?})")]
    MalformedClearCacheTime(String),
}

/// Renders a violation list one per line.
struct Violations<'a>(&'a [ConfigViolation]);

impl fmt::Display for Violations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for violation in self.0 {
            writeln!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `lastseen-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LastSeenConfig {
    /// Identity used to stamp derived events.
    #[serde(default)]
    pub processor: ProcessorIdentity,

    /// Replay cadence and cache-clear schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Messaging connection settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LastSeenConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `NATS_URL` overrides `infrastructure.nats_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Replay cadence and cache-clear settings.
///
/// Intervals are signed so that zero and negative values reach
/// [`validate`](Self::validate) instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Milliseconds between replay passes.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: i64,

    /// Milliseconds between individual sends within a pass.
    #[serde(default = "default_message_interval_ms")]
    pub message_interval_ms: i64,

    /// Local wall-clock time of the daily clear, `HH:MM:SS`.
    #[serde(default = "default_clear_cache_time")]
    pub clear_cache_time: String,

    /// Whether the daily clear empties the cache when it fires.
    #[serde(default)]
    pub auto_clear_cache: bool,

    /// Whether to empty the cache once at startup.
    #[serde(default)]
    pub clear_cache_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            message_interval_ms: default_message_interval_ms(),
            clear_cache_time: default_clear_cache_time(),
            auto_clear_cache: false,
            clear_cache_on_start: false,
        }
    }
}

impl ScheduleConfig {
    /// List every violated constraint. Empty means valid.
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut violations = Vec::new();
        if self.cycle_interval_ms <= 0 {
            violations.push(ConfigViolation::NonPositiveCycleInterval(
                self.cycle_interval_ms,
            ));
        }
        if self.message_interval_ms <= 0 {
            violations.push(ConfigViolation::NonPositiveMessageInterval(
                self.message_interval_ms,
            ));
        }
        if parse_clear_cache_time(&self.clear_cache_time).is_none() {
            violations.push(ConfigViolation::MalformedClearCacheTime(
                self.clear_cache_time.clone(),
            ));
        }
        violations
    }

    /// Convert into a typed [`Schedule`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every violation if the
    /// configuration does not validate.
    pub fn resolve(&self) -> Result<Schedule, ConfigError> {
        let violations = self.validate();
        let (Some(cycle_interval), Some(message_interval), Some(clear_cache_time)) = (
            positive_millis(self.cycle_interval_ms),
            positive_millis(self.message_interval_ms),
            parse_clear_cache_time(&self.clear_cache_time),
        ) else {
            return Err(ConfigError::Invalid { violations });
        };

        Ok(Schedule {
            cycle_interval,
            message_interval,
            clear_cache_time,
            auto_clear_cache: self.auto_clear_cache,
            clear_cache_on_start: self.clear_cache_on_start,
        })
    }
}

/// Validated, immutable schedule of a running processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Delay between replay passes.
    pub cycle_interval: Duration,
    /// Delay between sends within a pass.
    pub message_interval: Duration,
    /// Local time of the daily clear.
    pub clear_cache_time: NaiveTime,
    /// Initial state of the daily-clear gate.
    pub auto_clear_cache: bool,
    /// Whether to clear once before the first pass.
    pub clear_cache_on_start: bool,
}

/// Messaging connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject inbound events are consumed from.
    #[serde(default = "default_inbound_subject")]
    pub inbound_subject: String,

    /// Subject derived events are published to. Defaults to the
    /// processor's event destination.
    #[serde(default)]
    pub outbound_subject: Option<String>,
}

impl InfrastructureConfig {
    /// Override connection settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            inbound_subject: default_inbound_subject(),
            outbound_subject: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn parse_clear_cache_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), CLEAR_CACHE_TIME_FORMAT).ok()
}

fn positive_millis(ms: i64) -> Option<Duration> {
    u64::try_from(ms)
        .ok()
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
}

const fn default_cycle_interval_ms() -> i64 {
    1000
}

const fn default_message_interval_ms() -> i64 {
    10
}

fn default_clear_cache_time() -> String {
    String::from("00:00:00")
}

fn default_nats_url() -> String {
    String::from("nats://localhost:4222")
}

fn default_inbound_subject() -> String {
    String::from("lastseen.inbound")
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ScheduleConfig::default();
        assert_eq!(config.cycle_interval_ms, 1000);
        assert_eq!(config.message_interval_ms, 10);
        assert_eq!(config.clear_cache_time, "00:00:00");
        assert!(!config.auto_clear_cache);
        assert!(!config.clear_cache_on_start);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = LastSeenConfig::parse("{}").unwrap();
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert_eq!(config.processor, ProcessorIdentity::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.infrastructure.outbound_subject.is_none());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
processor:
  id: "tracks-1"
  definition_uri: "lastseen://processor/tracks"

schedule:
  cycle_interval_ms: 5000
  message_interval_ms: 2
  clear_cache_time: "23:30:00"
  auto_clear_cache: true
  clear_cache_on_start: true

infrastructure:
  inbound_subject: "tracks.raw"
  outbound_subject: "tracks.latest"

logging:
  level: "debug"
"#;
        let config = LastSeenConfig::parse(yaml).unwrap();
        assert_eq!(config.processor.id, "tracks-1");
        assert_eq!(config.schedule.cycle_interval_ms, 5000);
        assert_eq!(config.schedule.message_interval_ms, 2);
        assert!(config.schedule.auto_clear_cache);
        assert!(config.schedule.clear_cache_on_start);
        assert_eq!(config.infrastructure.inbound_subject, "tracks.raw");
        assert_eq!(
            config.infrastructure.outbound_subject.as_deref(),
            Some("tracks.latest")
        );
        assert_eq!(config.logging.level, "debug");

        let schedule = config.schedule.resolve().unwrap();
        assert_eq!(schedule.cycle_interval, Duration::from_secs(5));
        assert_eq!(
            schedule.clear_cache_time,
            NaiveTime::from_hms_opt(23, 30, 0).unwrap()
        );
    }

    #[test]
    fn zero_cycle_interval_is_a_violation() {
        let config = ScheduleConfig {
            cycle_interval_ms: 0,
            ..ScheduleConfig::default()
        };
        assert_eq!(
            config.validate(),
            vec![ConfigViolation::NonPositiveCycleInterval(0)]
        );
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn every_violation_is_reported() {
        let config = ScheduleConfig {
            cycle_interval_ms: -5,
            message_interval_ms: 0,
            clear_cache_time: String::from("25:99"),
            ..ScheduleConfig::default()
        };
        let violations = config.validate();
        assert_eq!(violations.len(), 3);

        let message = config.resolve().unwrap_err().to_string();
        assert!(message.contains("cycle_interval_ms"));
        assert!(message.contains("message_interval_ms"));
        assert!(message.contains("clear_cache_time"));
    }

    #[test]
    fn clear_cache_time_requires_seconds() {
        assert!(parse_clear_cache_time("06:15:30").is_some());
        assert!(parse_clear_cache_time("06:15").is_none());
        assert!(parse_clear_cache_time("noon").is_none());
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = LastSeenConfig::parse("schedule: [not, a, map");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
