//! Startup configuration, read from a RON file with environment overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use log::LevelFilter;
use scout_engine::{
    DeskConfig, FetchSettings, FormOverrides, HeaderSet, DEFAULT_FORM_NAME, DEFAULT_TABLE_ID,
};
use scout_logging::scout_info;
use serde::{Deserialize, Serialize};

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_PATH: &str = "./scout.ron";
pub const ENV_LISTING_URL: &str = "SCOUT_LISTING_URL";
pub const ENV_COOKIE: &str = "SCOUT_COOKIE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            max_bytes: settings.max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub listing_url: String,
    pub cookie: String,
    pub poll_interval_secs: u64,
    pub table_id: String,
    pub form_name: String,
    pub action_token: String,
    pub display_label: String,
    pub auto_start: bool,
    pub log_destination: LogDestination,
    pub log_level: LogLevel,
    pub fetch: FetchConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        let overrides = FormOverrides::default();
        Self {
            listing_url: String::new(),
            cookie: String::new(),
            poll_interval_secs: 60,
            table_id: DEFAULT_TABLE_ID.to_string(),
            form_name: DEFAULT_FORM_NAME.to_string(),
            action_token: overrides.action_token,
            display_label: overrides.display_label,
            auto_start: false,
            log_destination: LogDestination::Terminal,
            log_level: LogLevel::Info,
            fetch: FetchConfig::default(),
        }
    }
}

impl ScoutConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Applies `SCOUT_LISTING_URL` and `SCOUT_COOKIE` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_LISTING_URL) {
            self.listing_url = url;
        }
        if let Some(cookie) = lookup(ENV_COOKIE) {
            self.cookie = cookie;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listing_url.trim().is_empty() {
            bail!("listing_url is not set (config file or {ENV_LISTING_URL})");
        }
        url::Url::parse(&self.listing_url)
            .with_context(|| format!("listing_url {:?} is not an absolute URL", self.listing_url))?;
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        if self.cookie.is_empty() {
            scout_info!("No session cookie configured; set one with `cookie <value>`");
        }
        Ok(())
    }

    pub fn desk_config(&self) -> DeskConfig {
        DeskConfig {
            listing_url: self.listing_url.clone(),
            table_id: self.table_id.clone(),
            form_name: self.form_name.clone(),
            overrides: FormOverrides {
                action_token: self.action_token.clone(),
                display_label: self.display_label.clone(),
            },
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            max_bytes: self.fetch.max_bytes,
        }
    }

    pub fn headers(&self) -> HeaderSet {
        HeaderSet::with_cookie(self.cookie.clone())
    }
}
