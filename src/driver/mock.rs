//! In-process WebDriver for testing and dry runs.
//!
//! `MockDriverFactory` hands out `MockDriver` sessions that share one call
//! log, so a test can assert how many sessions were opened and quit and
//! how many were alive at once.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{By, DriverFactory, ElementRef, WebDriver};
use crate::capability::{Capability, platform_header};
use crate::error::{DriverError, DriverResult};

/// Scripted behavior shared by every session of a factory
#[derive(Debug, Clone, Default)]
struct Behavior {
    title: String,
    element_text: String,
    /// (script substring, result) pairs, first match wins
    script_results: Vec<(String, Value)>,
    missing_selectors: Vec<String>,
    navigation_delay: Duration,
    hang_on_navigate: bool,
    fail_navigation: Option<String>,
    fail_open: Option<String>,
}

#[derive(Debug, Default)]
struct Ledger {
    opened: AtomicUsize,
    quit: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl Ledger {
    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

/// Factory for scripted in-process sessions
#[derive(Debug, Clone, Default)]
pub struct MockDriverFactory {
    behavior: Arc<Behavior>,
    ledger: Arc<Ledger>,
}

impl MockDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions that behave like a healthy page: the layout hook reports
    /// ready and `#info` carries plausible desktop measurements
    pub fn dry_run() -> Self {
        let info = json!({
            "display": {"width": 1920, "height": 1080, "pixelRatio": 1, "orientation": "landscape-primary"},
            "glyph": {"width": 8, "height": 16},
            "orientation": {"type": "landscape-primary", "angle": 0},
            "text": {"lang": "en", "fontSize": "16px"},
            "size": {"innerWidth": 1920, "innerHeight": 960}
        });
        Self::new()
            .with_title("Dry run")
            .with_element_text(info.to_string())
            .with_script_result("Boolean(window.", Value::Bool(true))
            .with_script_result("!window.", Value::Bool(true))
    }

    fn behavior_mut(&mut self) -> &mut Behavior {
        Arc::make_mut(&mut self.behavior)
    }

    /// Title returned by every session
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.behavior_mut().title = title.into();
        self
    }

    /// Text returned for any found element
    pub fn with_element_text(mut self, text: impl Into<String>) -> Self {
        self.behavior_mut().element_text = text.into();
        self
    }

    /// Scripts containing `needle` return `result`
    pub fn with_script_result(mut self, needle: impl Into<String>, result: Value) -> Self {
        self.behavior_mut()
            .script_results
            .push((needle.into(), result));
        self
    }

    /// `find_element` fails with `NoSuchElement` for this selector
    pub fn with_missing_selector(mut self, selector: impl Into<String>) -> Self {
        self.behavior_mut().missing_selectors.push(selector.into());
        self
    }

    /// Every navigation takes this long
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.behavior_mut().navigation_delay = delay;
        self
    }

    /// Navigation never completes
    pub fn hanging(mut self) -> Self {
        self.behavior_mut().hang_on_navigate = true;
        self
    }

    /// Navigation fails with a protocol error
    pub fn failing_navigation(mut self, message: impl Into<String>) -> Self {
        self.behavior_mut().fail_navigation = Some(message.into());
        self
    }

    /// Session creation fails
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.behavior_mut().fail_open = Some(message.into());
        self
    }

    /// Sessions opened so far
    pub fn opened(&self) -> usize {
        self.ledger.opened.load(Ordering::SeqCst)
    }

    /// `quit` calls so far
    pub fn quit_count(&self) -> usize {
        self.ledger.quit.load(Ordering::SeqCst)
    }

    /// Highest number of sessions alive at the same time
    pub fn max_concurrent(&self) -> usize {
        self.ledger.max_live.load(Ordering::SeqCst)
    }

    /// Every call made on any session, as `session-id:call` strings
    pub fn calls(&self) -> Vec<String> {
        self.ledger
            .calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    async fn open(&self, capability: &Capability) -> DriverResult<Box<dyn WebDriver>> {
        if let Some(message) = &self.behavior.fail_open {
            return Err(DriverError::SessionNotCreated(message.clone()));
        }
        let n = self.ledger.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.ledger.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.ledger.max_live.fetch_max(live, Ordering::SeqCst);

        let session_id = format!("mock-{}", n);
        self.ledger
            .record(format!("{}:open:{}", session_id, platform_header(capability)));
        Ok(Box::new(MockDriver {
            session_id,
            behavior: Arc::clone(&self.behavior),
            ledger: Arc::clone(&self.ledger),
        }))
    }

    fn kind(&self) -> &str {
        "mock"
    }
}

/// One scripted session
#[derive(Debug)]
pub struct MockDriver {
    session_id: String,
    behavior: Arc<Behavior>,
    ledger: Arc<Ledger>,
}

#[async_trait]
impl WebDriver for MockDriver {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn get(&self, url: &str) -> DriverResult<()> {
        self.ledger.record(format!("{}:get:{}", self.session_id, url));
        if self.behavior.hang_on_navigate {
            std::future::pending::<()>().await;
        }
        if !self.behavior.navigation_delay.is_zero() {
            tokio::time::sleep(self.behavior.navigation_delay).await;
        }
        if let Some(message) = &self.behavior.fail_navigation {
            return Err(DriverError::Protocol {
                error: "unknown error".to_string(),
                message: message.clone(),
            });
        }
        Ok(())
    }

    async fn title(&self) -> DriverResult<String> {
        self.ledger.record(format!("{}:title", self.session_id));
        Ok(self.behavior.title.clone())
    }

    async fn find_element(&self, by: &By) -> DriverResult<ElementRef> {
        let selector = by.selector();
        self.ledger
            .record(format!("{}:find:{}", self.session_id, selector));
        if self.behavior.missing_selectors.contains(&selector) {
            return Err(DriverError::NoSuchElement { selector });
        }
        Ok(ElementRef(format!("{}-{}", self.session_id, selector)))
    }

    async fn element_text(&self, element: &ElementRef) -> DriverResult<String> {
        self.ledger
            .record(format!("{}:text:{}", self.session_id, element.0));
        Ok(self.behavior.element_text.clone())
    }

    async fn execute_script(&self, script: &str, _args: Vec<Value>) -> DriverResult<Value> {
        self.ledger.record(format!("{}:script", self.session_id));
        Ok(self
            .behavior
            .script_results
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or(Value::Null))
    }

    async fn quit(&self) -> DriverResult<()> {
        self.ledger.record(format!("{}:quit", self.session_id));
        self.ledger.quit.fetch_add(1, Ordering::SeqCst);
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityBuilder;
    use serde_json::json;

    fn capability() -> Capability {
        CapabilityBuilder::new()
            .os("Windows", "11")
            .browser("Edge", Some("120.0".to_string()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_tracks_sessions() {
        let factory = MockDriverFactory::new().with_title("Home");
        let a = factory.open(&capability()).await.unwrap();
        let b = factory.open(&capability()).await.unwrap();
        assert_eq!(a.title().await.unwrap(), "Home");
        a.quit().await.unwrap();
        b.quit().await.unwrap();

        assert_eq!(factory.opened(), 2);
        assert_eq!(factory.quit_count(), 2);
        assert_eq!(factory.max_concurrent(), 2);
        assert!(factory.calls().contains(&"mock-1:title".to_string()));
    }

    #[tokio::test]
    async fn test_mock_missing_selector() {
        let factory = MockDriverFactory::new().with_missing_selector("#chart");
        let driver = factory.open(&capability()).await.unwrap();
        let err = driver.find_element(&By::css("#chart")).await.unwrap_err();
        assert!(matches!(err, DriverError::NoSuchElement { .. }));
        assert!(driver.find_element(&By::Id("legend".to_string())).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_element_gives_up_after_timeout() {
        let factory = MockDriverFactory::new().with_missing_selector("#late");
        let driver = factory.open(&capability()).await.unwrap();
        let err = driver
            .wait_for_element(&By::css("#late"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NoSuchElement { .. }));
        let finds = factory.calls().iter().filter(|c| c.contains(":find:")).count();
        assert!(finds > 1);
    }

    #[tokio::test]
    async fn test_script_results_match_by_substring() {
        let factory = MockDriverFactory::new().with_script_result("innerWidth", json!(1280));
        let driver = factory.open(&capability()).await.unwrap();
        assert_eq!(
            driver
                .execute_script("return window.innerWidth;", vec![])
                .await
                .unwrap(),
            json!(1280)
        );
        assert_eq!(driver.execute_script("return 1;", vec![]).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_failing_open() {
        let factory = MockDriverFactory::new().failing_open("no capacity");
        assert!(factory.open(&capability()).await.is_err());
        assert_eq!(factory.opened(), 0);
    }
}
