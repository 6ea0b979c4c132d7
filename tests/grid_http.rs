//! HTTP-level tests for the inventory client and the remote WebDriver client

use httpmock::prelude::*;
use mockito::Matcher;
use serde_json::json;

use browser_matrix::{
    By, CapabilityBuilder, CapabilitySource, DriverError, DriverFactory, HarnessError,
    RemoteDriverFactory, RemoteInventory, WebDriver,
};

// base64("user:key")
const BASIC_AUTH: &str = "Basic dXNlcjprZXk=";

#[tokio::test]
async fn test_inventory_fetch_with_basic_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/automate/browsers.json")
        .match_header("authorization", BASIC_AUTH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"os": "Windows", "os_version": "11", "browser": "chrome", "browser_version": "120.0", "device": null},
                {"os": "android", "os_version": "13.0", "browser": "chrome", "browser_version": null, "device": "Pixel 7", "real_mobile": true}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let inventory = RemoteInventory::new(
        format!("{}/automate/browsers.json", server.url()),
        "user",
        "key",
    )
    .unwrap();
    let platforms = inventory.platforms().await.unwrap();

    mock.assert_async().await;
    assert_eq!(platforms.len(), 2);
    assert_eq!(platforms[1].device.as_deref(), Some("Pixel 7"));
}

#[tokio::test]
async fn test_inventory_rejection_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/automate/browsers.json")
        .match_header("authorization", Matcher::Any)
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let inventory = RemoteInventory::new(
        format!("{}/automate/browsers.json", server.url()),
        "user",
        "wrong",
    )
    .unwrap();
    let err = inventory.platforms().await.unwrap_err();
    assert!(matches!(err, HarnessError::Inventory(ref m) if m.contains("401")), "{}", err);
}

fn desktop_capability() -> browser_matrix::Capability {
    CapabilityBuilder::new()
        .os("Windows", "11")
        .browser("Chrome", Some("120.0".to_string()))
        .resolution("1920x1080")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_remote_session_lifecycle() {
    let server = MockServer::start_async().await;

    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/wd/hub/session").header("authorization", BASIC_AUTH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"sessionId": "abc123", "capabilities": {}}}));
        })
        .await;
    let navigate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/wd/hub/session/abc123/url")
                .json_body(json!({"url": "http://localhost:3000/"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": null}));
        })
        .await;
    let title = server
        .mock_async(|when, then| {
            when.method(GET).path("/wd/hub/session/abc123/title");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": "Home"}));
        })
        .await;
    let missing = server
        .mock_async(|when, then| {
            when.method(POST).path("/wd/hub/session/abc123/element");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"error": "no such element", "message": "Unable to locate element"}}));
        })
        .await;
    let quit = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/wd/hub/session/abc123");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": null}));
        })
        .await;

    let factory = RemoteDriverFactory::new(server.url("/wd/hub"), "user", "key").unwrap();
    let driver = factory.open(&desktop_capability()).await.unwrap();
    assert_eq!(driver.session_id(), "abc123");

    driver.get("http://localhost:3000/").await.unwrap();
    assert_eq!(driver.title().await.unwrap(), "Home");

    let err = driver.find_element(&By::css("#chart")).await.unwrap_err();
    assert!(matches!(err, DriverError::NoSuchElement { ref selector } if selector == "#chart"));

    driver.quit().await.unwrap();

    create.assert_async().await;
    navigate.assert_async().await;
    title.assert_async().await;
    missing.assert_async().await;
    quit.assert_async().await;
}

#[tokio::test]
async fn test_session_refused_by_grid() {
    let server = MockServer::start_async().await;
    let _create = server
        .mock_async(|when, then| {
            when.method(POST).path("/wd/hub/session");
            then.status(500)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"error": "session not created", "message": "All parallel slots are busy"}}));
        })
        .await;

    let factory = RemoteDriverFactory::new(server.url("/wd/hub"), "user", "key").unwrap();
    let err = match factory.open(&desktop_capability()).await {
        Ok(_) => panic!("grid should refuse the session"),
        Err(e) => e,
    };
    assert!(matches!(err, DriverError::SessionNotCreated(ref m) if m.contains("parallel slots")));
}

#[tokio::test]
async fn test_element_text_is_read_from_found_element() {
    let server = MockServer::start_async().await;
    let _create = server
        .mock_async(|when, then| {
            when.method(POST).path("/wd/hub/session");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"sessionId": "s1", "capabilities": {}}}));
        })
        .await;
    let find = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/wd/hub/session/s1/element")
                .json_body(json!({"using": "css selector", "value": "#info"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"element-6066-11e4-a52e-4f735466cecf": "el-7"}}));
        })
        .await;
    let text = server
        .mock_async(|when, then| {
            when.method(GET).path("/wd/hub/session/s1/element/el-7/text");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": "{\"glyph\":{\"width\":8}}"}));
        })
        .await;

    let factory = RemoteDriverFactory::new(server.url("/wd/hub"), "user", "key").unwrap();
    let driver = factory.open(&desktop_capability()).await.unwrap();
    let element = driver.find_element(&By::Id("info".to_string())).await.unwrap();
    assert_eq!(element.0, "el-7");
    assert_eq!(driver.element_text(&element).await.unwrap(), r#"{"glyph":{"width":8}}"#);

    find.assert_async().await;
    text.assert_async().await;
}

#[tokio::test]
async fn test_non_string_element_text_is_invalid_response() {
    let server = MockServer::start_async().await;
    let _create = server
        .mock_async(|when, then| {
            when.method(POST).path("/wd/hub/session");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"sessionId": "s2", "capabilities": {}}}));
        })
        .await;
    let _text = server
        .mock_async(|when, then| {
            when.method(GET).path("/wd/hub/session/s2/element/el-1/text");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"value": {"unexpected": true}}));
        })
        .await;

    let factory = RemoteDriverFactory::new(server.url("/wd/hub"), "user", "key").unwrap();
    let driver = factory.open(&desktop_capability()).await.unwrap();
    let err = driver
        .element_text(&browser_matrix::driver::ElementRef("el-1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::InvalidResponse(ref m) if m.contains("unexpected")), "{}", err);
}

#[tokio::test]
async fn test_non_json_gateway_error_refuses_session() {
    let server = MockServer::start_async().await;
    let _create = server
        .mock_async(|when, then| {
            when.method(POST).path("/wd/hub/session");
            then.status(502)
                .header("content-type", "text/html")
                .body("<html><body>Bad Gateway</body></html>");
        })
        .await;

    let factory = RemoteDriverFactory::new(server.url("/wd/hub"), "user", "key").unwrap();
    let err = match factory.open(&desktop_capability()).await {
        Ok(_) => panic!("gateway error should refuse the session"),
        Err(e) => e,
    };
    assert!(
        matches!(err, DriverError::SessionNotCreated(ref m) if m.contains("502") && m.contains("Bad Gateway")),
        "{}",
        err
    );
}
