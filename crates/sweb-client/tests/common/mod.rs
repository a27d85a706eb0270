//! Mock panel for HTTP-level tests
//!
//! Serves the auth page, the login form target, a landing page with the
//! version script and the account lookup, the way the real panel chains them.

#![allow(dead_code)]

use serde_json::{Value, json};
use sweb_client::{SwebApi, SwebClient};
use sweb_core::config::{Credentials, PanelEndpoints};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const USERNAME: &str = "u1234";
pub const PASSWORD: &str = "hunter2";
pub const DARK_SECRET: &str = "s3cr3t";
pub const API_VERSION: &str = "1.187.20240301";
pub const SCRIPT_PATH: &str = "/js/main~version.4f2a.js";

/// Endpoints pointing at the mock server
pub fn endpoints_for(server: &MockServer) -> PanelEndpoints {
    PanelEndpoints {
        auth_page_url: format!("{}/main/auth/", server.uri()),
        auth_submit_url: format!("{}/main/auth_submit/", server.uri()),
        redirect_to: "/".to_string(),
        landing_urls: vec![server.uri()],
        ..PanelEndpoints::default()
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD).with_user_agent("sweb-client-tests")
}

pub fn landing_html() -> String {
    format!(
        r#"<html><head>
        <script type="text/javascript" src="/js/vendor.js"></script>
        <script type="text/javascript" src="{}"></script>
        </head><body></body></html>"#,
        SCRIPT_PATH
    )
}

/// Auth page, form target and landing page
///
/// The form target only redirects when the dark secret cookie was echoed.
pub async fn mount_auth_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/main/auth/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("darksecret={}; Path=/", DARK_SECRET).as_str())
                .set_body_string("<html>login</html>"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/main/auth_submit/"))
        .and(body_string_contains(format!("darksecret={}", DARK_SECRET).as_str()))
        .and(body_string_contains(format!("login={}", USERNAME).as_str()))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/", server.uri()).as_str()),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_html()))
        .mount(server)
        .await;
}

/// Version script with the given body
pub async fn mount_version_script(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(SCRIPT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Account lookup answering with [`USERNAME`]
pub async fn mount_account(server: &MockServer) {
    mount_rpc(
        server,
        "/account",
        "getLoginAndType",
        json!({"result": {"login": USERNAME, "type": "vh"}}),
    )
    .await;
}

/// Everything a successful login needs
pub async fn mount_panel(server: &MockServer) {
    mount_auth_pages(server).await;
    mount_version_script(
        server,
        &format!(r#"!function(){{var e=function(){{return "{}"}}}}();"#, API_VERSION),
    )
    .await;
    mount_account(server).await;
}

/// Answer `rpc_method` on `endpoint_path` with a raw JSON-RPC body
pub async fn mount_rpc(server: &MockServer, endpoint_path: &str, rpc_method: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(endpoint_path))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A client logged in against a fully mounted mock panel
pub async fn logged_in_client(server: &MockServer) -> SwebClient {
    mount_panel(server).await;
    SwebClient::connect(credentials(), endpoints_for(server))
        .await
        .expect("login against mock panel succeeds")
}

pub async fn logged_in_api(server: &MockServer) -> SwebApi {
    SwebApi::new(logged_in_client(server).await)
}

/// POST requests received on `endpoint_path`, in order
pub async fn posts_to(server: &MockServer, endpoint_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .into_iter()
        .filter(|request| request.method.as_str() == "POST" && request.url.path() == endpoint_path)
        .collect()
}

/// Bodies of the POST requests received on `endpoint_path`
pub async fn rpc_bodies(server: &MockServer, endpoint_path: &str) -> Vec<Value> {
    posts_to(server, endpoint_path)
        .await
        .iter()
        .map(|request| request.body_json::<Value>().expect("JSON body"))
        .collect()
}
