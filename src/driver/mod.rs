//! WebDriver abstraction used by tasks and the session runner.
//!
//! Two implementations are provided:
//! - `RemoteSession` speaks the W3C WebDriver wire protocol to a grid hub
//! - `MockDriver` runs in-process, for tests and dry runs

pub mod mock;
pub mod remote;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::capability::Capability;
use crate::error::{DriverError, DriverResult};

pub use mock::{MockDriver, MockDriverFactory};
pub use remote::{RemoteDriverFactory, RemoteSession};

/// Interval between `find_element` attempts while waiting
pub const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Element location strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum By {
    Css(String),
    Id(String),
}

impl By {
    pub fn css(selector: impl Into<String>) -> Self {
        By::Css(selector.into())
    }

    /// W3C `(using, value)` pair
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            By::Css(s) => ("css selector", s.clone()),
            By::Id(s) => ("css selector", format!("#{}", s)),
        }
    }

    /// Selector text as shown in reports
    pub fn selector(&self) -> String {
        self.strategy().1
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (using, value) = self.strategy();
        write!(f, "{}={}", using, value)
    }
}

/// Opaque handle to an element inside a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// One open browser session
#[async_trait]
pub trait WebDriver: Send + Sync {
    /// Session identifier assigned by the hub
    fn session_id(&self) -> &str;

    async fn get(&self, url: &str) -> DriverResult<()>;

    async fn title(&self) -> DriverResult<String>;

    async fn find_element(&self, by: &By) -> DriverResult<ElementRef>;

    async fn element_text(&self, element: &ElementRef) -> DriverResult<String>;

    /// Run a synchronous script body; its `return` value comes back as JSON
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> DriverResult<Value>;

    /// Client-side pause
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Poll for an element until it appears or `timeout` elapses
    async fn wait_for_element(&self, by: &By, timeout: Duration) -> DriverResult<ElementRef> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find_element(by).await {
                Ok(element) => return Ok(element),
                Err(DriverError::NoSuchElement { .. })
                    if tokio::time::Instant::now() < deadline =>
                {
                    tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// End the session. Called exactly once per opened session.
    async fn quit(&self) -> DriverResult<()>;
}

/// Opens sessions for capabilities
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self, capability: &Capability) -> DriverResult<Box<dyn WebDriver>>;

    /// Label for logs ("remote", "mock")
    fn kind(&self) -> &str;
}
