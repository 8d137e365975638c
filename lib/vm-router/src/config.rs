//! Router config. Example:
//!
//! ```toml
//! version = 1
//! log_level = "info"
//! default_timeout_ms = -1
//! queue_capacity = 64
//! ```
use std::str::FromStr;

use serde::Deserialize;

use crate::RouterError;

const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ConfigV1 {
    version: u32, // Must be 1
    #[serde(default = "default_log_level")]
    log_level: String, // off|error|warn|info|debug|trace
    #[serde(default = "default_timeout_ms")]
    default_timeout_ms: i32,
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_timeout_ms() -> i32 {
    -1
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    log_level: log::LevelFilter,
    default_timeout_ms: i32,
    queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: log::LevelFilter::Info,
            default_timeout_ms: default_timeout_ms(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    fn new(conf: ConfigV1) -> Result<Self, RouterError> {
        if conf.version != 1 {
            return Err(RouterError::Config(format!(
                "unsupported config version {}",
                conf.version
            )));
        }

        let log_level = log::LevelFilter::from_str(&conf.log_level)
            .map_err(|_| RouterError::Config(format!("bad log level '{}'", conf.log_level)))?;

        if conf.queue_capacity == 0 {
            return Err(RouterError::Config("queue_capacity must be > 0".to_owned()));
        }

        Ok(Self {
            log_level,
            default_timeout_ms: conf.default_timeout_ms,
            queue_capacity: conf.queue_capacity,
        })
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, RouterError> {
        let config_v1 = toml::from_str::<ConfigV1>(toml_str)?;
        Self::new(config_v1)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level
    }

    pub fn default_timeout_ms(&self) -> i32 {
        self.default_timeout_ms
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Caps the `log` max level. Installing a logger is up to the caller.
    pub fn apply_log_level(&self) {
        log::set_max_level(self.log_level);
    }
}

pub fn read_from_file(path: &str) -> Result<Config, RouterError> {
    let toml_str = std::fs::read_to_string(path)?;
    Config::from_toml_str(&toml_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let config = Config::from_toml_str(
            r#"
version = 1
log_level = "debug"
default_timeout_ms = 500
queue_capacity = 8
"#,
        )
        .unwrap();

        assert_eq!(log::LevelFilter::Debug, config.log_level());
        assert_eq!(500, config.default_timeout_ms());
        assert_eq!(8, config.queue_capacity());
    }

    #[test]
    fn defaults() {
        let config = Config::from_toml_str("version = 1").unwrap();
        assert_eq!(Config::default(), config);
        assert_eq!(-1, config.default_timeout_ms());
    }

    #[test]
    fn bad_configs() {
        for bad in [
            "version = 2",
            "version = 1\nlog_level = \"chatty\"",
            "version = 1\nqueue_capacity = 0",
        ] {
            assert!(matches!(
                Config::from_toml_str(bad),
                Err(RouterError::Config(_))
            ));
        }

        assert!(matches!(
            Config::from_toml_str("log_level = \"info\""),
            Err(RouterError::Toml(_))
        ));
        assert!(matches!(
            Config::from_toml_str("version = 1\nextra = true"),
            Err(RouterError::Toml(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_from_file("/nonexistent/vm-router.toml"),
            Err(RouterError::Io(_))
        ));
    }
}
