//! Session runner: one remote browser session per work item.
//!
//! Lifecycle of a work item:
//! `pending -> session-open -> task-running -> settled -> session-closed -> recorded`
//!
//! - The task runs under a deadline; on expiry its future is dropped
//! - Panics inside a task are caught and recorded as exceptions
//! - `quit` is called exactly once for every session that was opened,
//!   whichever way the task settled
//! - Every call returns exactly one `ResultRecord`

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::capability::{Capability, Variant, platform_header};
use crate::driver::{DriverFactory, WebDriver};
use crate::error::{DriverError, TaskError, describe_timeout, error_chain};
use crate::report::{Outcome, ResultRecord};
use crate::task::{Task, TaskContext, TaskLogger};

/// Upper bound on how long closing a session may take
const QUIT_TIMEOUT: Duration = Duration::from_secs(30);

/// One (task, capability) execution unit
#[derive(Clone)]
pub struct WorkItem {
    pub task: Arc<dyn Task>,
    /// Capability with the variant already applied
    pub capability: Capability,
    pub variant: Option<Variant>,
}

impl WorkItem {
    pub fn new(task: Arc<dyn Task>, capability: Capability, variant: Option<Variant>) -> Self {
        Self {
            task,
            capability,
            variant,
        }
    }

    pub fn header(&self) -> String {
        platform_header(&self.capability)
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("task", &self.task.id())
            .field("platform", &self.header())
            .finish()
    }
}

/// Runs work items against sessions from a driver factory
#[derive(Clone)]
pub struct SessionRunner {
    factory: Arc<dyn DriverFactory>,
    target: String,
    timeout: Duration,
}

impl SessionRunner {
    pub fn new(factory: Arc<dyn DriverFactory>, target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            factory,
            target: target.into(),
            timeout,
        }
    }

    /// Run one work item to completion and normalize the result
    pub async fn run(&self, item: &WorkItem) -> ResultRecord {
        let log = TaskLogger::new(item.header(), item.task.id());
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();

        log.info("opening session");
        let outcome = match self.factory.open(&item.capability).await {
            Ok(driver) => {
                let outcome = self.drive(item, driver.as_ref(), &log).await;
                close(driver.as_ref(), &log).await;
                outcome
            }
            Err(e) => {
                log.error(format!("session not opened: {}", e));
                driver_exception(&e)
            }
        };

        match &outcome {
            Outcome::Timeout { trace, .. } => log.error(trace),
            other => match other.failure() {
                Some((exception, _)) => log.error(exception),
                None => log.info("done"),
            },
        }

        ResultRecord {
            capabilities: item.capability.clone(),
            task_id: item.task.id().to_string(),
            outcome,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        }
    }

    async fn drive(&self, item: &WorkItem, driver: &dyn WebDriver, log: &TaskLogger) -> Outcome {
        let ctx = TaskContext {
            driver,
            capability: &item.capability,
            target: &self.target,
            log: log.clone(),
        };
        let guarded = AssertUnwindSafe(item.task.run(&ctx)).catch_unwind();

        match tokio::time::timeout(self.timeout, guarded).await {
            Err(_) => Outcome::timeout(self.timeout.as_millis() as u64),
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                Outcome::Exception {
                    trace: format!("task panicked: {}", message),
                    exception: message,
                }
            }
            Ok(Ok(Ok(value))) => Outcome::Success { result: value },
            Ok(Ok(Err(TaskError::ElementNotFound { selector }))) => {
                Outcome::element_not_found(selector)
            }
            Ok(Ok(Err(e))) => Outcome::Exception {
                exception: e.to_string(),
                trace: error_chain(&e),
            },
        }
    }
}

/// Release the session; failures are logged, never recorded
async fn close(driver: &dyn WebDriver, log: &TaskLogger) {
    match tokio::time::timeout(QUIT_TIMEOUT, driver.quit()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log.error(format!("quit failed: {}", e)),
        Err(_) => log.error(format!("quit {}", describe_timeout(QUIT_TIMEOUT))),
    }
}

fn driver_exception(err: &DriverError) -> Outcome {
    Outcome::Exception {
        exception: err.to_string(),
        trace: error_chain(err),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
