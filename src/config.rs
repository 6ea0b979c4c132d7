//! Configuration management with environment variable support.
//!
//! All values are read once at process start. The remote grid credentials
//! use the vendor's own variable names; everything else is prefixed with
//! `BROWSER_MATRIX_`.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BROWSERSTACK_USERNAME` | Remote grid user name | (empty) |
//! | `BROWSERSTACK_ACCESS_KEY` | Remote grid access key | (empty) |
//! | `BROWSERSTACK_LOCAL_IDENTIFIER` | Local tunnel identifier | (unset) |
//! | `BROWSERSTACK_PROJECT_NAME` | Project name shown on the grid | (unset) |
//! | `BROWSERSTACK_BUILD_NAME` | Build name shown on the grid | (unset) |
//! | `BROWSER_MATRIX_HUB_URL` | WebDriver hub URL | `https://hub-cloud.browserstack.com/wd/hub` |
//! | `BROWSER_MATRIX_INVENTORY_URL` | Browser inventory endpoint | `https://api.browserstack.com/5/browsers?flat=true` |
//! | `BROWSER_MATRIX_TARGET` | Base URL the tasks navigate to | `http://localhost:3000` |
//! | `BROWSER_MATRIX_REPORT` | JSON report path | `test/data/selenium-report.json` |
//! | `BROWSER_MATRIX_CONCURRENCY` | Sessions in flight | `5` |
//! | `BROWSER_MATRIX_INTERVAL_MS` | Minimum gap between dispatch bursts (ms) | `20000` |
//! | `BROWSER_MATRIX_TASK_TIMEOUT_MS` | Per-task deadline (ms) | `30000` |
//!
//! # Example
//!
//! ```bash
//! export BROWSERSTACK_USERNAME="jane"
//! export BROWSERSTACK_ACCESS_KEY="s3cr3t"
//! export BROWSER_MATRIX_CONCURRENCY=2
//! browser-matrix run --task route-landing
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default WebDriver hub
pub const DEFAULT_HUB_URL: &str = "https://hub-cloud.browserstack.com/wd/hub";

/// Default browser inventory endpoint
pub const DEFAULT_INVENTORY_URL: &str = "https://api.browserstack.com/5/browsers?flat=true";

/// Default navigation target
pub const DEFAULT_TARGET: &str = "http://localhost:3000";

/// Default report location
pub const DEFAULT_REPORT_PATH: &str = "test/data/selenium-report.json";

/// Default number of sessions in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default gap between dispatch bursts (milliseconds)
pub const DEFAULT_INTERVAL_MS: u64 = 20_000;

/// Default per-task deadline (milliseconds)
pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 30_000;

/// Value sent as `consoleLogs` in the vendor options
pub const DEFAULT_CONSOLE_LOGS: &str = "errors";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_USERNAME: &str = "BROWSERSTACK_USERNAME";
pub const ENV_ACCESS_KEY: &str = "BROWSERSTACK_ACCESS_KEY";
pub const ENV_LOCAL_IDENTIFIER: &str = "BROWSERSTACK_LOCAL_IDENTIFIER";
pub const ENV_PROJECT_NAME: &str = "BROWSERSTACK_PROJECT_NAME";
pub const ENV_BUILD_NAME: &str = "BROWSERSTACK_BUILD_NAME";

pub const ENV_HUB_URL: &str = "BROWSER_MATRIX_HUB_URL";
pub const ENV_INVENTORY_URL: &str = "BROWSER_MATRIX_INVENTORY_URL";
pub const ENV_TARGET: &str = "BROWSER_MATRIX_TARGET";
pub const ENV_REPORT_PATH: &str = "BROWSER_MATRIX_REPORT";
pub const ENV_CONCURRENCY: &str = "BROWSER_MATRIX_CONCURRENCY";
pub const ENV_INTERVAL_MS: &str = "BROWSER_MATRIX_INTERVAL_MS";
pub const ENV_TASK_TIMEOUT_MS: &str = "BROWSER_MATRIX_TASK_TIMEOUT_MS";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote grid credentials and build labels
    pub grid: GridSettings,
    /// Queue and timeout settings
    pub run: RunSettings,
}

/// Remote grid settings
#[derive(Debug, Clone)]
pub struct GridSettings {
    pub username: String,
    pub access_key: String,
    pub local_identifier: Option<String>,
    pub project_name: Option<String>,
    pub build_name: Option<String>,
    /// WebDriver hub URL (no credentials embedded)
    pub hub_url: String,
    /// Browser inventory URL (no credentials embedded)
    pub inventory_url: String,
}

/// Orchestration settings
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub target: String,
    pub report_path: PathBuf,
    pub concurrency: usize,
    pub interval: Duration,
    pub task_timeout: Duration,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            grid: GridSettings::from_env(),
            run: RunSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            grid: GridSettings::defaults(),
            run: RunSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl GridSettings {
    pub fn from_env() -> Self {
        Self {
            username: env::var(ENV_USERNAME).unwrap_or_default(),
            access_key: env::var(ENV_ACCESS_KEY).unwrap_or_default(),
            local_identifier: non_empty_var(ENV_LOCAL_IDENTIFIER),
            project_name: non_empty_var(ENV_PROJECT_NAME),
            build_name: non_empty_var(ENV_BUILD_NAME),
            hub_url: env::var(ENV_HUB_URL).unwrap_or_else(|_| DEFAULT_HUB_URL.to_string()),
            inventory_url: env::var(ENV_INVENTORY_URL)
                .unwrap_or_else(|_| DEFAULT_INVENTORY_URL.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            username: String::new(),
            access_key: String::new(),
            local_identifier: None,
            project_name: None,
            build_name: None,
            hub_url: DEFAULT_HUB_URL.to_string(),
            inventory_url: DEFAULT_INVENTORY_URL.to_string(),
        }
    }

    /// Whether credentials were supplied at all
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.access_key.is_empty()
    }
}

impl RunSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Unparsable numbers fall back to
    /// the defaults instead of failing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |name: &str| lookup(name).and_then(|raw| parse_value::<u64>(&raw));
        Self {
            target: lookup(ENV_TARGET).unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            report_path: lookup(ENV_REPORT_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH)),
            concurrency: lookup(ENV_CONCURRENCY)
                .and_then(|raw| parse_value::<usize>(&raw))
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_CONCURRENCY),
            interval: Duration::from_millis(number(ENV_INTERVAL_MS).unwrap_or(DEFAULT_INTERVAL_MS)),
            task_timeout: Duration::from_millis(
                number(ENV_TASK_TIMEOUT_MS).unwrap_or(DEFAULT_TASK_TIMEOUT_MS),
            ),
        }
    }

    pub fn defaults() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            concurrency: DEFAULT_CONCURRENCY,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            task_timeout: Duration::from_millis(DEFAULT_TASK_TIMEOUT_MS),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a raw environment value, ignoring surrounding whitespace
fn parse_value<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}
