use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for run-level operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Result type for WebDriver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for task bodies
pub type TaskResult<T> = Result<T, TaskError>;

/// Failures that abort a whole run.
///
/// Per-task failures never end up here; they become result records.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("capability inventory failed: {0}")]
    Inventory(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("report write failed for {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        HarnessError::Inventory(err.to_string())
    }
}

/// Errors raised by a WebDriver implementation
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("no such element: {selector}")]
    NoSuchElement { selector: String },
    #[error("session not created: {0}")]
    SessionNotCreated(String),
    #[error("webdriver error `{error}`: {message}")]
    Protocol { error: String, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("script error: {0}")]
    Script(String),
}

/// Errors produced by task bodies
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },
    #[error("driver call failed: {0}")]
    Driver(#[source] DriverError),
    #[error("{0}")]
    Failed(String),
}

impl From<DriverError> for TaskError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NoSuchElement { selector } => TaskError::ElementNotFound { selector },
            other => TaskError::Driver(other),
        }
    }
}

/// Capability builder validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("missing field `{0}`")]
    Missing(&'static str),
    #[error("device orientation requires a device")]
    OrientationWithoutDevice,
    #[error("resolution is only valid for desktop platforms")]
    ResolutionOnDevice,
    #[error("orientation and resolution are mutually exclusive")]
    OrientationAndResolution,
}

/// Result type for the report flattener
pub type FlattenResult<T> = Result<T, FlattenError>;

/// Errors raised while flattening a persisted report
#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("report {path} is unreadable: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("report is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("report must be a top-level array")]
    NotAnArray,
    #[error("{count} record(s) have an empty `result`")]
    EmptyResults { count: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render an error and its source chain, outermost first.
///
/// Stands in for a stack trace in exception records.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}

/// Human readable deadline, used in timeout log lines
pub fn describe_timeout(after: Duration) -> String {
    format!("timed out after {}ms", after.as_millis())
}
