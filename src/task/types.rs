use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::capability::Capability;
use crate::driver::WebDriver;
use crate::error::TaskResult;

/// A named browser check run once per capability variant
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable identifier, used in reports and on the command line
    fn id(&self) -> &str;

    /// One-line description for `--help` style listings
    fn description(&self) -> &str {
        ""
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> TaskResult<Value>;
}

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id()).finish()
    }
}

/// Everything a task may touch while it runs
pub struct TaskContext<'a> {
    pub driver: &'a dyn WebDriver,
    pub capability: &'a Capability,
    /// Base URL routes are appended to
    pub target: &'a str,
    pub log: TaskLogger,
}

impl TaskContext<'_> {
    /// Absolute URL for a route on the target
    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.target.trim_end_matches('/'), route)
    }
}

/// Progress logger that prefixes every line with the platform header
#[derive(Debug, Clone)]
pub struct TaskLogger {
    header: String,
    task_id: String,
}

impl TaskLogger {
    pub fn new(header: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            task_id: task_id.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(task = %self.task_id, "{} {}", self.header, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(task = %self.task_id, "{} {}", self.header, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(task = %self.task_id, "{} {}", self.header, message);
    }
}
