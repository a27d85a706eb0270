//! Integration Test: Scraped Login Sequence
//!
//! Constraints verified:
//! - The dark secret cookie is echoed in the login form
//! - The API version is scraped from the marked script bundle
//! - The panel login is learned through the account lookup
//! - Unknown landing pages, missing scripts and missing versions fail the login
//! - RPC calls are refused until a login succeeds

mod common;

use common::*;
use serde_json::json;
use sweb_client::{LoginState, SwebClient};
use sweb_core::Error;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn login_scrapes_version_and_learns_user() {
    let server = MockServer::start().await;
    mount_panel(&server).await;

    let client = SwebClient::new(credentials(), endpoints_for(&server)).unwrap();
    assert!(!client.is_authenticated().await);

    client.login().await.expect("login succeeds");

    assert!(client.is_authenticated().await);
    assert_eq!(client.api_version().await.as_deref(), Some(API_VERSION));
    assert_eq!(client.user().await.as_deref(), Some(USERNAME));
    assert!(matches!(
        client.login_state().await,
        LoginState::Authenticated(_)
    ));
}

#[tokio::test]
async fn login_form_carries_credentials_and_dark_secret() {
    let server = MockServer::start().await;
    logged_in_client(&server).await;

    let submits = posts_to(&server, "/main/auth_submit/").await;
    assert_eq!(submits.len(), 1);

    let form = String::from_utf8(submits[0].body.clone()).unwrap();
    for field in [
        "login=u1234",
        "password=hunter2",
        "new_panel=1",
        "savepref=",
        "darksecret=s3cr3t",
    ] {
        assert!(form.contains(field), "form {:?} lacks {:?}", form, field);
    }

    let referer = submits[0].headers.get("referer").unwrap().to_str().unwrap();
    assert_eq!(referer, format!("{}/main/auth/", server.uri()));
}

#[tokio::test]
async fn account_lookup_is_sent_without_user() {
    let server = MockServer::start().await;
    logged_in_client(&server).await;

    let bodies = rpc_bodies(&server, "/account").await;
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].get("user").is_none());
    assert_eq!(bodies[0]["version"], API_VERSION);
    assert_eq!(bodies[0]["params"], json!({}));
}

#[tokio::test]
async fn unexpected_landing_page_fails_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/main/auth/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;
    // Wrong password: the panel sends the browser back to the auth page
    Mock::given(method("POST"))
        .and(path("/main/auth_submit/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/main/auth/?error=1", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let client = SwebClient::new(credentials(), endpoints_for(&server)).unwrap();
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, Error::LoginFailed(_)));
    assert!(err.to_string().contains("unexpected redirect"));
    assert!(matches!(client.login_state().await, LoginState::Failed(_)));

    let err = client
        .call("domains/dns", "info", json!({"domain": "example.com"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
}

#[tokio::test]
async fn landing_page_without_version_script_fails_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/main/auth/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/main/auth_submit/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><script src="/js/vendor.js"></script></html>"#),
        )
        .mount(&server)
        .await;

    let client = SwebClient::new(credentials(), endpoints_for(&server)).unwrap();
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, Error::LoginFailed(_)));
    assert!(!client.is_authenticated().await);
}

#[tokio::test]
async fn script_without_version_fails_login() {
    let server = MockServer::start().await;
    mount_auth_pages(&server).await;
    mount_version_script(&server, "!function(){return null}();").await;
    mount_account(&server).await;

    let client = SwebClient::new(credentials(), endpoints_for(&server)).unwrap();
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, Error::LoginFailed(_)));
    assert!(client.api_version().await.is_none());
    assert!(posts_to(&server, "/account").await.is_empty());
}
