use chrono::TimeDelta;
use std::{env, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("SALES_MONTHLY_GOAL must be positive, got {0}")]
    InvalidGoal(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub store: StoreBackend,
    pub monthly_goal: f64,
    pub recent_sales_limit: usize,
    pub attendance_min_gap: TimeDelta,
    pub qr_image_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            data_path: PathBuf::from("data/state.json"),
            store: StoreBackend::File,
            monthly_goal: 15000.0,
            recent_sales_limit: 5,
            attendance_min_gap: TimeDelta::seconds(5),
            qr_image_base_url: "https://api.qrserver.com/v1/create-qr-code/".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store = match lookup("APP_STORE").as_deref().map(str::trim) {
            None | Some("") | Some("file") => StoreBackend::File,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_STORE",
                    value: other.to_string(),
                });
            }
        };

        let monthly_goal = parse(&lookup, "SALES_MONTHLY_GOAL", defaults.monthly_goal)?;
        if monthly_goal.is_nan() || monthly_goal <= 0.0 {
            return Err(ConfigError::InvalidGoal(monthly_goal));
        }

        let min_gap_secs: i64 = parse(&lookup, "ATTENDANCE_MIN_GAP_SECS", 5)?;
        if min_gap_secs < 0 {
            return Err(ConfigError::Invalid {
                name: "ATTENDANCE_MIN_GAP_SECS",
                value: min_gap_secs.to_string(),
            });
        }

        Ok(Self {
            port: parse(&lookup, "PORT", defaults.port)?,
            data_path: lookup("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            store,
            monthly_goal,
            recent_sales_limit: parse(&lookup, "RECENT_SALES_LIMIT", defaults.recent_sales_limit)?,
            attendance_min_gap: TimeDelta::seconds(min_gap_secs),
            qr_image_base_url: lookup("QR_IMAGE_BASE_URL").unwrap_or(defaults.qr_image_base_url),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        assert_eq!(config_from(&[]), Ok(Config::default()));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("APP_STORE", "memory"),
            ("SALES_MONTHLY_GOAL", "2000.5"),
            ("RECENT_SALES_LIMIT", "3"),
            ("ATTENDANCE_MIN_GAP_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.monthly_goal, 2000.5);
        assert_eq!(config.recent_sales_limit, 3);
        assert_eq!(config.attendance_min_gap, TimeDelta::zero());
    }

    #[test]
    fn non_positive_goal_is_fatal() {
        assert_eq!(
            config_from(&[("SALES_MONTHLY_GOAL", "0")]),
            Err(ConfigError::InvalidGoal(0.0))
        );
    }

    #[test]
    fn garbage_values_are_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("APP_STORE", "firestore")]).is_err());
        assert!(config_from(&[("ATTENDANCE_MIN_GAP_SECS", "-1")]).is_err());
    }
}
