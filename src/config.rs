//! Per-target store configuration parsed from the daemon's key/value options

use crate::errors::{ForwarderError, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Connection settings for the destination Redis list.
///
/// Built once per worker from the target's string key/value options and never
/// re-read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Address of a single Redis endpoint (direct mode)
    pub server: String,

    /// Sentinel addresses (high-availability mode)
    pub sentinels: Vec<String>,

    /// Name of the Sentinel-monitored master group
    pub master_name: String,

    /// Optional AUTH password
    pub password: Option<String>,

    /// Database index selected after connecting
    pub database: i64,

    /// Key of the destination list
    pub list: String,

    /// Timeout for establishing a connection (including the health probe)
    pub connect_timeout: Duration,

    /// Timeout for reading a command response
    pub read_timeout: Duration,

    /// Timeout for a single write command
    pub write_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            sentinels: Vec::new(),
            master_name: String::new(),
            password: None,
            database: 0,
            list: String::new(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Build a configuration from the target's option map.
    ///
    /// Unknown keys are ignored; malformed values are a configuration error
    /// surfaced to the start operation.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self> {
        let mut config = StoreConfig::default();

        if let Some(server) = options.get("redis-address") {
            config.server = server.clone();
        }

        if let Some(sentinels) = options.get("redis-sentinels") {
            config.sentinels = parse_list(sentinels);
        }

        if let Some(master_name) = options.get("redis-master-name") {
            config.master_name = master_name.clone();
        }

        if let Some(password) = options.get("redis-password") {
            if !password.is_empty() {
                config.password = Some(password.clone());
            }
        }

        if let Some(database) = options.get("redis-database") {
            config.database = parse_int("redis-database", database)?;
        }

        if let Some(list) = options.get("redis-list") {
            config.list = list.clone();
        }

        if let Some(timeout) = options.get("redis-connect-timeout") {
            config.connect_timeout = parse_duration("redis-connect-timeout", timeout)?;
        }

        if let Some(timeout) = options.get("redis-read-timeout") {
            config.read_timeout = parse_duration("redis-read-timeout", timeout)?;
        }

        if let Some(timeout) = options.get("redis-write-timeout") {
            config.write_timeout = parse_duration("redis-write-timeout", timeout)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration selects exactly one connection strategy
    /// and names a destination list.
    pub fn validate(&self) -> Result<()> {
        if self.list.is_empty() {
            return Err(ForwarderError::Config(
                "redis-list must be specified".to_string(),
            ));
        }

        if self.server.is_empty() {
            if self.sentinels.is_empty() {
                return Err(ForwarderError::Config(
                    "either redis-address or redis-sentinels must be specified".to_string(),
                ));
            }
            if self.master_name.is_empty() {
                return Err(ForwarderError::Config(
                    "redis-master-name must be specified when using redis-sentinels".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// True when the configuration selects the Sentinel-brokered strategy.
    pub fn is_sentinel(&self) -> bool {
        self.server.is_empty()
    }
}

/// Split a comma-separated option value into trimmed entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value.parse().map_err(|_| {
        ForwarderError::Config(format!("{}: invalid integer {:?}", key, value))
    })
}

/// Parse a duration with a unit suffix (`ms`, `s`, `m`, `h`), e.g. `"5s"`.
fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    let invalid = || ForwarderError::Config(format!("{}: invalid duration {:?}", key, value));

    let (number, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(0) | None => return Err(invalid()),
        Some(idx) => value.split_at(idx),
    };

    let number: u64 = number.parse().map_err(|_| invalid())?;

    match unit {
        "ms" => Ok(Duration::from_millis(number)),
        "s" => Ok(Duration::from_secs(number)),
        "m" => Ok(Duration::from_secs(number * 60)),
        "h" => Ok(Duration::from_secs(number * 3600)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_direct_config_with_defaults() {
        let config = StoreConfig::from_options(&options(&[
            ("redis-address", "localhost:6379"),
            ("redis-list", "logs"),
        ]))
        .unwrap();

        assert_eq!(config.server, "localhost:6379");
        assert_eq!(config.list, "logs");
        assert_eq!(config.database, 0);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert!(!config.is_sentinel());
    }

    #[test]
    fn test_sentinel_config() {
        let config = StoreConfig::from_options(&options(&[
            ("redis-sentinels", "s1:26379, s2:26379,s3:26379"),
            ("redis-master-name", "mymaster"),
            ("redis-list", "logs"),
            ("redis-database", "3"),
            ("redis-password", "secret"),
        ]))
        .unwrap();

        assert!(config.is_sentinel());
        assert_eq!(config.sentinels, vec!["s1:26379", "s2:26379", "s3:26379"]);
        assert_eq!(config.master_name, "mymaster");
        assert_eq!(config.database, 3);
        assert_eq!(config.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_missing_list_rejected() {
        let err = StoreConfig::from_options(&options(&[("redis-address", "localhost:6379")]))
            .unwrap_err();
        assert!(matches!(err, ForwarderError::Config(_)));
    }

    #[test]
    fn test_sentinels_without_master_name_rejected() {
        let err = StoreConfig::from_options(&options(&[
            ("redis-sentinels", "s1:26379"),
            ("redis-list", "logs"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ForwarderError::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_errors_not_panics() {
        let err = StoreConfig::from_options(&options(&[
            ("redis-address", "localhost:6379"),
            ("redis-list", "logs"),
            ("redis-database", "not-a-number"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ForwarderError::Config(_)));

        let err = StoreConfig::from_options(&options(&[
            ("redis-address", "localhost:6379"),
            ("redis-list", "logs"),
            ("redis-connect-timeout", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ForwarderError::Config(_)));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(
            parse_duration("t", "250ms").unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(parse_duration("t", "5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("t", "2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("t", "1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("t", "5").is_err());
        assert!(parse_duration("t", "s").is_err());
        assert!(parse_duration("t", "5d").is_err());
    }
}
