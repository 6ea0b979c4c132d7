//! Types for run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::capability::Capability;
use crate::error::describe_timeout;

/// Message stored as `exception` on timed-out records
pub const TIMEOUT_MESSAGE: &str = "Timeout!";

/// How a work item settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Outcome {
    /// The task returned a value
    Success { result: Value },

    /// An expected element never appeared
    ElementNotFound {
        selector: String,
        exception: String,
        trace: String,
    },

    /// The task or the driver raised an error
    Exception { exception: String, trace: String },

    /// The task did not finish before the deadline
    Timeout {
        exception: String,
        trace: String,
        #[serde(rename = "afterMs")]
        after_ms: u64,
    },
}

impl Outcome {
    pub fn timeout(after_ms: u64) -> Self {
        Outcome::Timeout {
            exception: TIMEOUT_MESSAGE.to_string(),
            trace: describe_timeout(Duration::from_millis(after_ms)),
            after_ms,
        }
    }

    pub fn element_not_found(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        let exception = format!("element not found: {}", selector);
        Outcome::ElementNotFound {
            trace: format!("{}\ncaused by: no such element: {}", exception, selector),
            exception,
            selector,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::ElementNotFound { .. } => OutcomeKind::ElementNotFound,
            Outcome::Exception { .. } => OutcomeKind::Exception,
            Outcome::Timeout { .. } => OutcomeKind::Timeout,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Message and trace of a failed outcome
    pub fn failure(&self) -> Option<(&str, &str)> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::ElementNotFound { exception, trace, .. }
            | Outcome::Exception { exception, trace }
            | Outcome::Timeout { exception, trace, .. } => {
                Some((exception.as_str(), trace.as_str()))
            }
        }
    }
}

/// Outcome discriminant, for tallies and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    ElementNotFound,
    Exception,
    Timeout,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeKind::Success => "success",
            OutcomeKind::ElementNotFound => "element-not-found",
            OutcomeKind::Exception => "exception",
            OutcomeKind::Timeout => "timeout",
        })
    }
}

/// Normalized result of one work item.
///
/// Serialized flat: `{capabilities, taskId, outcome, result}` on success,
/// `{capabilities, taskId, outcome, exception, trace}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub capabilities: Capability,
    pub task_id: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Outcome tallies for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub element_not_found: usize,
    pub exception: usize,
    pub timeout: usize,
}

impl RunSummary {
    pub fn add(&mut self, kind: OutcomeKind) {
        self.total += 1;
        match kind {
            OutcomeKind::Success => self.success += 1,
            OutcomeKind::ElementNotFound => self.element_not_found += 1,
            OutcomeKind::Exception => self.exception += 1,
            OutcomeKind::Timeout => self.timeout += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.total - self.success
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} success, {} element not found, {} exception, {} timeout",
            self.total, self.success, self.element_not_found, self.exception, self.timeout
        )
    }
}
