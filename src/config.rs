//! Layered configuration for the monitor.
//!
//! Settings are resolved from three layers, later layers winning:
//! - built-in defaults
//! - an optional `wordwatch.toml` file
//! - `WORDWATCH_`-prefixed environment variables, with double
//!   underscores separating nested levels:
//!   `WORDWATCH_MONITOR__CHECK_INTERVAL_SECS=2` sets
//!   `monitor.check_interval_secs`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Existence monitor tuning.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Hard limits applied at startup.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    /// Seconds between existence sweeps. The sweep period is fixed and
    /// does not stretch with the number of monitored files.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Cosmetic pause before exit once the last file is gone, so the
    /// final watcher output lands before the farewell line.
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    /// Maximum number of files accepted on the command line.
    #[serde(default = "default_max_watches")]
    pub max_watches: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `monitor = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Settings {
    /// Load settings with the layered figment stack.
    ///
    /// `config_path` overrides the default `wordwatch.toml` lookup.
    pub fn load(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("wordwatch.toml"));

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("WORDWATCH_").split("__"))
            .extract()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            grace_delay_ms: default_grace_delay_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_watches: default_max_watches(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_check_interval_secs() -> u64 {
    5
}

fn default_grace_delay_ms() -> u64 {
    1000
}

fn default_max_watches() -> usize {
    128
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.monitor.check_interval_secs, 5);
        assert_eq!(settings.monitor.grace_delay_ms, 1000);
        assert_eq!(settings.limits.max_watches, 128);
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.logging.modules.is_empty());
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wordwatch.toml");
        std::fs::write(
            &path,
            r#"
[monitor]
check_interval_secs = 2

[limits]
max_watches = 16

[logging]
default = "info"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.monitor.check_interval_secs, 2);
        // Untouched keys keep their defaults.
        assert_eq!(settings.monitor.grace_delay_ms, 1000);
        assert_eq!(settings.limits.max_watches, 16);
        assert_eq!(settings.logging.default, "info");
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.limits.max_watches, 128);
    }
}
