use std::env;
use std::str::FromStr;

const LOG_FILTER_VAR: &str = "DISPATCH_LOG_FILTER";
const METRICS_ENABLED_VAR: &str = "DISPATCH_METRICS_ENABLED";
const METRICS_PORT_VAR: &str = "DISPATCH_METRICS_PORT";
const EXPECTED_RECORDS_VAR: &str = "DISPATCH_EXPECTED_RECORDS";

const DEFAULT_LOG_FILTER: &str = "info,event_dispatch=debug";
const DEFAULT_METRICS_PORT: u16 = 9090;
const DEFAULT_EXPECTED_RECORDS: usize = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Used when RUST_LOG is not set
    pub log_filter: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
    pub expected_records: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            metrics_enabled: true,
            metrics_port: DEFAULT_METRICS_PORT,
            expected_records: DEFAULT_EXPECTED_RECORDS,
        }
    }
}

impl AppConfig {
    /// Read the process environment, after loading `.env` if one is present.
    /// Variables already set in the environment win over the file.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            log_filter: lookup(LOG_FILTER_VAR).unwrap_or(defaults.log_filter),
            metrics_enabled: match lookup(METRICS_ENABLED_VAR) {
                Some(raw) => parse_bool(METRICS_ENABLED_VAR, &raw)?,
                None => defaults.metrics_enabled,
            },
            metrics_port: parse_or(METRICS_PORT_VAR, lookup(METRICS_PORT_VAR), defaults.metrics_port)?,
            expected_records: parse_or(
                EXPECTED_RECORDS_VAR,
                lookup(EXPECTED_RECORDS_VAR),
                defaults.expected_records,
            )?,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}
