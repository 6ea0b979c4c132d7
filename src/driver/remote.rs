//! W3C WebDriver client for a remote grid hub.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::time::Duration;

use super::{By, DriverFactory, ElementRef, WebDriver};
use crate::capability::Capability;
use crate::config::GridSettings;
use crate::error::{DriverError, DriverResult};

/// W3C element identifier key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Pre-W3C element identifier key, still sent by some grids
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Session creation on a busy grid can take well over a minute
const SESSION_CREATE_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    access_key: String,
}

impl Credentials {
    fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            req
        } else {
            req.basic_auth(&self.username, Some(&self.access_key))
        }
    }
}

/// Opens sessions against a WebDriver hub
#[derive(Debug, Clone)]
pub struct RemoteDriverFactory {
    hub_url: String,
    credentials: Credentials,
    http: reqwest::Client,
}

impl RemoteDriverFactory {
    pub fn new(
        hub_url: impl Into<String>,
        username: impl Into<String>,
        access_key: impl Into<String>,
    ) -> DriverResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(SESSION_CREATE_TIMEOUT)
            .build()?;
        Ok(Self {
            hub_url: hub_url.into().trim_end_matches('/').to_string(),
            credentials: Credentials {
                username: username.into(),
                access_key: access_key.into(),
            },
            http,
        })
    }

    pub fn from_settings(grid: &GridSettings) -> DriverResult<Self> {
        Self::new(&grid.hub_url, &grid.username, &grid.access_key)
    }
}

#[async_trait]
impl DriverFactory for RemoteDriverFactory {
    async fn open(&self, capability: &Capability) -> DriverResult<Box<dyn WebDriver>> {
        let url = format!("{}/session", self.hub_url);
        let body = json!({
            "capabilities": {
                "alwaysMatch": capability,
                "firstMatch": [{}]
            }
        });
        tracing::debug!(url = %url, browser = %capability.browser_name, "creating session");

        let req = self.http.post(&url).json(&body);
        let resp = self.credentials.apply(req).send().await?;
        let payload = read_payload(resp, None).await.map_err(|e| match e {
            DriverError::Protocol { message, .. } => DriverError::SessionNotCreated(message),
            other => other,
        })?;

        let session_id = payload
            .pointer("/value/sessionId")
            .or_else(|| payload.get("sessionId"))
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::InvalidResponse(format!("no sessionId in {}", payload)))?
            .to_string();

        tracing::debug!(session = %session_id, "session created");
        Ok(Box::new(RemoteSession {
            base_url: format!("{}/session/{}", self.hub_url, session_id),
            session_id,
            credentials: self.credentials.clone(),
            http: self.http.clone(),
        }))
    }

    fn kind(&self) -> &str {
        "remote"
    }
}

/// An open session on the hub
#[derive(Debug, Clone)]
pub struct RemoteSession {
    session_id: String,
    base_url: String,
    credentials: Credentials,
    http: reqwest::Client,
}

impl RemoteSession {
    /// Send one command and unwrap the W3C `value` envelope
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        selector: Option<&str>,
    ) -> DriverResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = self.credentials.apply(req).send().await?;
        let payload = read_payload(resp, selector).await?;
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl WebDriver for RemoteSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn get(&self, url: &str) -> DriverResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })), None)
            .await?;
        Ok(())
    }

    async fn title(&self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/title", None, None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::InvalidResponse(format!("title is not a string: {}", value)))
    }

    async fn find_element(&self, by: &By) -> DriverResult<ElementRef> {
        let (using, value) = by.strategy();
        let selector = by.selector();
        let found = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
                Some(&selector),
            )
            .await?;
        found
            .get(ELEMENT_KEY)
            .or_else(|| found.get(LEGACY_ELEMENT_KEY))
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| DriverError::InvalidResponse(format!("no element id in {}", found)))
    }

    async fn element_text(&self, element: &ElementRef) -> DriverResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None, None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::InvalidResponse(format!("element text is not a string: {}", value)))
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
            None,
        )
        .await
        .map_err(|e| match e {
            DriverError::Protocol { error, message } if error == "javascript error" => {
                DriverError::Script(message)
            }
            other => other,
        })
    }

    async fn quit(&self) -> DriverResult<()> {
        self.command(Method::DELETE, "", None, None).await?;
        tracing::debug!(session = %self.session_id, "session closed");
        Ok(())
    }
}

/// Read a hub response body.
///
/// Bodies that are not JSON (proxy error pages, empty replies) read as
/// `null`; a failed status then reports the status line and raw text.
async fn read_payload(resp: reqwest::Response, selector: Option<&str>) -> DriverResult<Value> {
    let status = resp.status();
    let text = resp.text().await?;
    let payload = serde_json::from_str(&text).unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(payload);
    }
    Err(match protocol_error(&payload, selector) {
        DriverError::Protocol { error, message } if message.is_empty() => DriverError::Protocol {
            error,
            message: format!("{} {}", status, text.trim()).trim_end().to_string(),
        },
        other => other,
    })
}

/// Map a W3C error body to a driver error
fn protocol_error(payload: &Value, selector: Option<&str>) -> DriverError {
    let error = payload
        .pointer("/value/error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = payload
        .pointer("/value/message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match error.as_str() {
        "no such element" => DriverError::NoSuchElement {
            selector: selector.map(str::to_string).unwrap_or(message),
        },
        "session not created" => DriverError::SessionNotCreated(message),
        _ => DriverError::Protocol { error, message },
    }
}
