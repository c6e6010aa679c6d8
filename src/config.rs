use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{capacity_for, RETENTION_WINDOW};

const DEFAULT_HOSTS: &str = "vcenter.skynetsystems.io,google.com,cloudflare.com";
const DEFAULT_HOST_FILE: &str = "/tmp/monitored_hosts.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Optional TOML overlay named by `LATMON_CONFIG`; durations are in seconds
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    hosts: Option<Vec<String>>,
    check_interval: Option<u64>,
    tcp_port: Option<u16>,
    host_file: Option<String>,
    max_concurrency: Option<usize>,
    http_timeout: Option<f64>,
    tcp_timeout: Option<f64>,
    icmp_timeout: Option<f64>,
    probe_attempts: Option<usize>,
    log_level: Option<String>,
}

impl FileConfig {
    fn read(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
        Ok(toml::from_str(&content)?)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hosts: Vec<String>,
    pub check_interval: Duration,
    pub tcp_port: u16,
    pub host_file: Option<PathBuf>,
    pub max_concurrency: usize,
    pub http_timeout: Duration,
    pub tcp_timeout: Duration,
    pub icmp_timeout: Duration,
    pub probe_attempts: usize,
    pub log_level: String,
    /// Values changed during validation, reported once logging is up
    pub adjustments: Vec<String>,
}

impl Config {
    /// Defaults, then the optional config file, then environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var("LATMON_CONFIG") {
            Ok(path) if !path.trim().is_empty() => FileConfig::read(PathBuf::from(path))?,
            _ => FileConfig::default(),
        };
        Self::from_sources(file, |key| env::var(key).ok())
    }

    fn from_sources(file: FileConfig, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parsed = |key: &str| var(key).and_then(|s| s.trim().parse::<u64>().ok());
        let seconds = |key: &str| var(key).and_then(|s| s.trim().parse::<f64>().ok());

        let check_interval = parsed("CHECK_INTERVAL").or(file.check_interval).unwrap_or(60);
        if check_interval == 0 {
            return Err(ConfigError::Invalid("CHECK_INTERVAL must be at least 1 second".to_string()));
        }

        let hosts = match var("MONITORED_HOSTS") {
            Some(list) => split_hosts(list.split(',')),
            None => match file.hosts {
                Some(list) => split_hosts(list.iter().map(String::as_str)),
                None => split_hosts(DEFAULT_HOSTS.split(',')),
            },
        };

        let host_file = match var("LATMON_HOST_FILE").or(file.host_file) {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_HOST_FILE)),
        };

        let mut config = Self {
            port: var("LATMON_PORT")
                .or_else(|| var("PORT"))
                .and_then(|s| s.trim().parse().ok())
                .or(file.port)
                .unwrap_or(8080),
            hosts,
            check_interval: Duration::from_secs(check_interval),
            tcp_port: var("TCP_PORT")
                .and_then(|s| s.trim().parse().ok())
                .or(file.tcp_port)
                .unwrap_or(443),
            host_file,
            max_concurrency: parsed("LATMON_MAX_CONCURRENCY")
                .map(|n| n as usize)
                .or(file.max_concurrency)
                .unwrap_or(8),
            http_timeout: secs(seconds("LATMON_HTTP_TIMEOUT").or(file.http_timeout).unwrap_or(5.0)),
            tcp_timeout: secs(seconds("LATMON_TCP_TIMEOUT").or(file.tcp_timeout).unwrap_or(3.0)),
            icmp_timeout: secs(seconds("LATMON_ICMP_TIMEOUT").or(file.icmp_timeout).unwrap_or(10.0)),
            probe_attempts: parsed("LATMON_PROBE_ATTEMPTS")
                .map(|n| n as usize)
                .or(file.probe_attempts)
                .unwrap_or(3),
            log_level: var("LATMON_LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
            adjustments: Vec::new(),
        };

        config.enforce_limits();
        Ok(config)
    }

    /// Keep the interval within the retention window, every probe timeout
    /// strictly below the interval and the counters positive
    fn enforce_limits(&mut self) {
        if self.check_interval > RETENTION_WINDOW {
            self.adjustments.push(format!(
                "check_interval {:?} clamped to the {:?} retention window",
                self.check_interval, RETENTION_WINDOW
            ));
            self.check_interval = RETENTION_WINDOW;
        }

        let cap = self.check_interval.mul_f64(0.9);
        let interval = self.check_interval;

        for (name, timeout) in [
            ("http_timeout", &mut self.http_timeout),
            ("tcp_timeout", &mut self.tcp_timeout),
            ("icmp_timeout", &mut self.icmp_timeout),
        ] {
            if timeout.is_zero() || *timeout >= interval {
                self.adjustments.push(format!(
                    "{} {:?} clamped to {:?} (check interval {:?})",
                    name, timeout, cap, interval
                ));
                *timeout = cap;
            }
        }

        if self.max_concurrency == 0 {
            self.adjustments.push("max_concurrency 0 raised to 1".to_string());
            self.max_concurrency = 1;
        }
        if self.probe_attempts == 0 {
            self.adjustments.push("probe_attempts 0 raised to 1".to_string());
            self.probe_attempts = 1;
        }
    }

    /// Samples retained per host
    pub fn capacity(&self) -> usize {
        capacity_for(RETENTION_WINDOW, self.check_interval)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Trimmed, non-empty, first occurrence wins
fn split_hosts<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for host in raw.map(str::trim).filter(|h| !h.is_empty()) {
        if !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
    }
    hosts
}
