//! Configuration loading and typed config structures for the dining table.
//!
//! The configuration lives in an optional `dining-config.yaml` in the working
//! directory. Every field has a default, so an empty file (or no file at all)
//! describes the classic five-seat table with 400-800ms phases that runs until
//! the process is killed.

use std::path::Path;

use dining_types::GrantPolicy;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
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

    /// A value parsed but is not usable.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What was wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level table configuration.
///
/// Mirrors the structure of `dining-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableConfig {
    /// Ring size and grant policy.
    #[serde(default)]
    pub table: TableSection,

    /// Think and eat duration ranges.
    #[serde(default)]
    pub durations: DurationConfig,

    /// Run boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TableConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DINING_ACTORS` overrides `table.actors`
    /// - `DINING_POLICY` overrides `table.policy`
    /// - `DINING_MAX_REAL_TIME_SECONDS` overrides `simulation.max_real_time_seconds`
    ///
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    ///
    /// Environment overrides and validation apply in both cases.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// No environment overrides and no validation are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DINING_ACTORS") {
            self.table.actors = val.trim().parse().map_err(|e| ConfigError::Invalid {
                reason: format!("invalid DINING_ACTORS: {e}"),
            })?;
        }
        if let Some(val) = lookup("DINING_POLICY") {
            self.table.policy = val
                .parse()
                .map_err(|reason: String| ConfigError::Invalid { reason })?;
        }
        if let Some(val) = lookup("DINING_MAX_REAL_TIME_SECONDS") {
            self.simulation.max_real_time_seconds =
                val.trim().parse().map_err(|e| ConfigError::Invalid {
                    reason: format!("invalid DINING_MAX_REAL_TIME_SECONDS: {e}"),
                })?;
        }
        Ok(())
    }

    /// Check that the configuration describes a runnable table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a ring smaller than two seats or
    /// a duration range whose minimum exceeds its maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table.actors < 2 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "table.actors must be at least 2, got {}",
                    self.table.actors
                ),
            });
        }
        let d = &self.durations;
        if d.think_min_ms > d.think_max_ms {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "think range is empty: {}ms > {}ms",
                    d.think_min_ms, d.think_max_ms
                ),
            });
        }
        if d.eat_min_ms > d.eat_max_ms {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "eat range is empty: {}ms > {}ms",
                    d.eat_min_ms, d.eat_max_ms
                ),
            });
        }
        Ok(())
    }
}

/// Ring size and grant policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSection {
    /// Number of actors seated around the ring.
    #[serde(default = "default_actors")]
    pub actors: usize,

    /// Rule used to adjudicate fork requests.
    #[serde(default)]
    pub policy: GrantPolicy,
}

impl Default for TableSection {
    fn default() -> Self {
        Self {
            actors: default_actors(),
            policy: GrantPolicy::default(),
        }
    }
}

/// Think and eat duration ranges, inclusive, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DurationConfig {
    /// Shortest thinking phase.
    #[serde(default = "default_min_ms")]
    pub think_min_ms: u64,

    /// Longest thinking phase.
    #[serde(default = "default_max_ms")]
    pub think_max_ms: u64,

    /// Shortest eating phase.
    #[serde(default = "default_min_ms")]
    pub eat_min_ms: u64,

    /// Longest eating phase.
    #[serde(default = "default_max_ms")]
    pub eat_max_ms: u64,

    /// Seed for reproducible durations. `None` draws from the thread-local
    /// generator.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            think_min_ms: default_min_ms(),
            think_max_ms: default_max_ms(),
            eat_min_ms: default_min_ms(),
            eat_max_ms: default_max_ms(),
            seed: None,
        }
    }
}

/// Run boundary configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Wall-clock seconds before every actor is stopped (0 = run forever).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for diagnostics.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_actors() -> usize {
    5
}

const fn default_min_ms() -> u64 {
    400
}

const fn default_max_ms() -> u64 {
    800
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_the_classic_table() {
        let config = TableConfig::default();
        assert_eq!(config.table.actors, 5);
        assert_eq!(config.table.policy, GrantPolicy::NeighbourCheck);
        assert_eq!(config.durations.think_min_ms, 400);
        assert_eq!(config.durations.eat_max_ms, 800);
        assert_eq!(config.simulation.max_real_time_seconds, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
table:
  actors: 7
  policy: ordered

durations:
  think_min_ms: 10
  think_max_ms: 20
  eat_min_ms: 30
  eat_max_ms: 40
  seed: 99

simulation:
  max_real_time_seconds: 12

logging:
  level: "debug"
  format: json
"#;

        let config = TableConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.table.actors, 7);
        assert_eq!(config.table.policy, GrantPolicy::Ordered);
        assert_eq!(config.durations.think_max_ms, 20);
        assert_eq!(config.durations.seed, Some(99));
        assert_eq!(config.simulation.max_real_time_seconds, 12);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = TableConfig::parse("table:\n  actors: 3\n");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.table.actors, 3);
        // Everything else uses defaults
        assert_eq!(config.durations.eat_min_ms, 400);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(TableConfig::parse("").ok(), Some(TableConfig::default()));
    }

    #[test]
    fn rejects_one_seat_table() {
        let mut config = TableConfig::default();
        config.table.actors = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = TableConfig::default();
        config.durations.eat_min_ms = 900;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_replace_yaml_values() {
        let mut vars = BTreeMap::new();
        vars.insert("DINING_ACTORS", "9");
        vars.insert("DINING_POLICY", "ordered");
        vars.insert("DINING_MAX_REAL_TIME_SECONDS", "30");

        let mut config = TableConfig::default();
        let result = config.apply_overrides(|key| vars.get(key).map(|v| (*v).to_owned()));
        assert!(result.is_ok());
        assert_eq!(config.table.actors, 9);
        assert_eq!(config.table.policy, GrantPolicy::Ordered);
        assert_eq!(config.simulation.max_real_time_seconds, 30);
    }

    #[test]
    fn malformed_override_is_an_error() {
        let mut config = TableConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "DINING_ACTORS").then(|| "five".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        assert_eq!(config.table.actors, 5);
    }

    #[test]
    fn project_config_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("dining-config.yaml");
        if path.exists() {
            let contents = std::fs::read_to_string(&path).unwrap_or_default();
            let config = TableConfig::parse(&contents);
            assert!(config.is_ok(), "Failed to parse project config: {config:?}");
            assert_eq!(config.ok().unwrap_or_default(), TableConfig::default());
        }
    }
}
