//! Client configuration.
//!
//! A [`Configuration`] is a bag of string settings assembled with consuming
//! setters and then handed to a [`crate::Client`], after which it is shared
//! read-only. Typed readers fall back to a default when a key is missing and
//! fail when a value is present but malformed.

use std::{collections::BTreeMap, time::Duration};

use crate::{error::ClientError, scan::DEFAULT_SCANNER_CACHING};

/// Deadline for each dispatched request, in milliseconds.
pub const OPERATION_TIMEOUT_KEY: &str = "regionkv.client.operation.timeout";
/// Deadline for each scan open/fetch round trip, in milliseconds. Defaults to
/// the operation timeout.
pub const SCANNER_TIMEOUT_KEY: &str = "regionkv.client.scanner.timeout";
/// Rows requested per scan fetch when the scan does not say.
pub const SCANNER_CACHING_KEY: &str = "regionkv.client.scanner.caching";

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set_int(self, key: impl Into<String>, value: i64) -> Self {
        self.set(key, value.to_string())
    }

    pub fn set_bool(self, key: impl Into<String>, value: bool) -> Self {
        self.set(key, value.to_string())
    }

    /// Store a duration as whole milliseconds.
    pub fn set_duration(self, key: impl Into<String>, value: Duration) -> Self {
        self.set(key, value.as_millis().to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, ClientError> {
        self.parse(key, default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ClientError> {
        self.parse(key, default)
    }

    /// Read a millisecond duration.
    pub fn get_duration_ms(&self, key: &str, default: Duration) -> Result<Duration, ClientError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| invalid(key, raw)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ClientError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|_| invalid(key, raw)),
        }
    }
}

fn invalid(key: &str, raw: &str) -> ClientError {
    ClientError::InvalidConfig {
        key: key.to_string(),
        value: raw.to_string(),
    }
}

/// Settings the table core reads, resolved once when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientOptions {
    pub(crate) operation_timeout: Duration,
    pub(crate) scanner_timeout: Duration,
    pub(crate) scanner_caching: usize,
}

impl ClientOptions {
    pub(crate) fn from_conf(conf: &Configuration) -> Result<Self, ClientError> {
        let operation_timeout =
            conf.get_duration_ms(OPERATION_TIMEOUT_KEY, DEFAULT_OPERATION_TIMEOUT)?;
        let scanner_timeout = conf.get_duration_ms(SCANNER_TIMEOUT_KEY, operation_timeout)?;
        let caching = conf.get_int(SCANNER_CACHING_KEY, DEFAULT_SCANNER_CACHING as i64)?;
        if caching < 1 {
            return Err(invalid(SCANNER_CACHING_KEY, &caching.to_string()));
        }
        Ok(Self {
            operation_timeout,
            scanner_timeout,
            scanner_caching: caching as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        ClientOptions, Configuration, DEFAULT_OPERATION_TIMEOUT, OPERATION_TIMEOUT_KEY,
        SCANNER_CACHING_KEY, SCANNER_TIMEOUT_KEY,
    };
    use crate::{error::ClientError, scan::DEFAULT_SCANNER_CACHING};

    #[test]
    fn typed_reads_with_defaults() {
        let conf = Configuration::new()
            .set("regionkv.quorum", "localhost:2181")
            .set_int("threads", 6)
            .set_bool("display", true);
        assert_eq!(conf.get("regionkv.quorum"), Some("localhost:2181"));
        assert_eq!(conf.get_or("missing", "fallback"), "fallback");
        assert_eq!(conf.get_int("threads", 1).unwrap(), 6);
        assert_eq!(conf.get_int("missing", 3).unwrap(), 3);
        assert!(conf.get_bool("display", false).unwrap());
        assert_eq!(conf.iter().count(), 3);
    }

    #[test]
    fn malformed_values_are_errors() {
        let conf = Configuration::new().set("threads", "six");
        assert_eq!(
            conf.get_int("threads", 1),
            Err(ClientError::InvalidConfig {
                key: "threads".into(),
                value: "six".into()
            })
        );
        assert!(conf.get_duration_ms("threads", Duration::ZERO).is_err());
    }

    #[test]
    fn options_defaults() {
        let opts = ClientOptions::from_conf(&Configuration::new()).unwrap();
        assert_eq!(opts.operation_timeout, DEFAULT_OPERATION_TIMEOUT);
        assert_eq!(opts.scanner_timeout, DEFAULT_OPERATION_TIMEOUT);
        assert_eq!(opts.scanner_caching, DEFAULT_SCANNER_CACHING);
    }

    #[test]
    fn options_overrides() {
        let conf = Configuration::new()
            .set_duration(OPERATION_TIMEOUT_KEY, Duration::from_millis(250))
            .set_int(SCANNER_CACHING_KEY, 7);
        let opts = ClientOptions::from_conf(&conf).unwrap();
        assert_eq!(opts.operation_timeout, Duration::from_millis(250));
        assert_eq!(opts.scanner_timeout, Duration::from_millis(250));
        assert_eq!(opts.scanner_caching, 7);

        let conf = conf.set_int(SCANNER_TIMEOUT_KEY, 10);
        let opts = ClientOptions::from_conf(&conf).unwrap();
        assert_eq!(opts.scanner_timeout, Duration::from_millis(10));
    }

    #[test]
    fn zero_caching_rejected() {
        let conf = Configuration::new().set_int(SCANNER_CACHING_KEY, 0);
        assert!(ClientOptions::from_conf(&conf).is_err());
    }
}
