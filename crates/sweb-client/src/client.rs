//! Cookie-carrying HTTP session against the panel
//!
//! `SwebClient` owns the login sequence and the JSON-RPC transport. It never
//! retries: every failure is returned to the caller, and an expired session
//! shows up as the panel's own RPC error.

use crate::login::{
    LoginState, check_landing_url, dark_secret_from_cookies, extract_version, find_version_script,
};
use crate::rpc::{RpcResponse, normalize_params};
use crate::session::{Session, SessionUrls};
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ORIGIN, REFERER};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use sweb_core::config::{Credentials, PanelEndpoints, SwebConfig};
use sweb_core::{Error, Result};
use tokio::sync::RwLock;

/// Accept header for the RPC endpoints
const RPC_ACCEPT: &str = "application/json, text/plain, */*";

/// Accept header for the HTML login pages
const HTML_ACCEPT: &str = "text/html, */*";

/// Endpoint and method used to learn the panel login after authenticating
const ACCOUNT_ENDPOINT: &str = "account";
const ACCOUNT_METHOD: &str = "getLoginAndType";

/// User agent sent when none is configured
pub fn default_user_agent() -> String {
    format!("Mozilla/5.0; sweb-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Session-aware JSON-RPC client for the SpaceWeb panel
///
/// # Security
///
/// The password is only ever sent in the login form. The Debug
/// implementation does not expose it.
pub struct SwebClient {
    /// Panel credentials
    /// ⚠️ NEVER log the password
    credentials: Credentials,

    /// Login and landing page URLs
    endpoints: PanelEndpoints,

    /// Cookies shared by every request of this session
    jar: Arc<Jar>,

    /// HTTP client carrying the cookie jar
    http: reqwest::Client,

    /// Login progress
    state: RwLock<LoginState>,
}

impl std::fmt::Debug for SwebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwebClient")
            .field("username", &self.credentials.username)
            .field("password", &"<REDACTED>")
            .field("auth_page_url", &self.endpoints.auth_page_url)
            .finish()
    }
}

impl SwebClient {
    /// Create a client; no request is made until [`login`](Self::login)
    pub fn new(credentials: Credentials, endpoints: PanelEndpoints) -> Result<Self> {
        credentials.validate()?;
        endpoints.validate()?;

        let jar = Arc::new(Jar::default());
        let user_agent = credentials
            .user_agent
            .clone()
            .unwrap_or_else(default_user_agent);

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(user_agent)
            .timeout(Duration::from_secs(endpoints.http_timeout_secs))
            .build()
            .map_err(Error::transport)?;

        Ok(Self {
            credentials,
            endpoints,
            jar,
            http,
            state: RwLock::new(LoginState::Unauthenticated),
        })
    }

    /// Create a client from the full configuration
    pub fn from_config(config: &SwebConfig) -> Result<Self> {
        Self::new(config.credentials.clone(), config.endpoints.clone())
    }

    /// Create a client and log in right away
    pub async fn connect(credentials: Credentials, endpoints: PanelEndpoints) -> Result<Self> {
        let client = Self::new(credentials, endpoints)?;
        client.login().await?;
        Ok(client)
    }

    /// Run the login sequence
    ///
    /// On success the client holds the API version, the panel login and the
    /// session cookies. On failure the state records the reason and RPC calls
    /// keep failing with `NotAuthenticated`.
    pub async fn login(&self) -> Result<()> {
        *self.state.write().await = LoginState::Authenticating;

        match self.run_login().await {
            Ok(session) => {
                tracing::info!(
                    user = %session.user,
                    version = %session.version,
                    "Logged in to the panel"
                );
                *self.state.write().await = LoginState::Authenticated(session);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Panel login failed");
                *self.state.write().await = LoginState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_login(&self) -> Result<Session> {
        let auth_page = parse_url(&self.endpoints.auth_page_url)?;

        // Step 1: the auth page hands out the dark secret cookie
        tracing::debug!(url = %auth_page, "Fetching auth page");
        self.http
            .get(auth_page.clone())
            .header(ACCEPT, HTML_ACCEPT)
            .send()
            .await
            .map_err(Error::transport)?
            .error_for_status()
            .map_err(Error::transport)?;

        let cookies = self.jar.cookies(&auth_page);
        let dark_secret =
            dark_secret_from_cookies(cookies.as_ref().and_then(|value| value.to_str().ok()));
        if dark_secret.is_empty() {
            tracing::debug!("Auth page set no dark secret cookie");
        }

        // Step 2: submit the login form and follow the redirects
        let form = [
            ("login", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
            ("new_panel", "1"),
            ("to", self.endpoints.redirect_to.as_str()),
            ("savepref", ""),
            ("darksecret", dark_secret.as_str()),
        ];
        let response = self
            .http
            .post(&self.endpoints.auth_submit_url)
            .header(REFERER, auth_page.as_str())
            .header(ACCEPT, HTML_ACCEPT)
            .form(&form)
            .send()
            .await
            .map_err(Error::transport)?;

        // Step 3: the redirect chain must end on a landing page
        let landing = response.url().clone();
        check_landing_url(&landing, &self.endpoints.landing_urls)?;
        let html = response.text().await.map_err(Error::transport)?;

        // Step 4: scrape the API version from the panel's script bundle
        let marker = &self.endpoints.version_script_marker;
        let script_url = find_version_script(&html, &landing, marker).ok_or_else(|| {
            Error::login_failed(format!(
                "no script containing {:?} on {}",
                marker, landing
            ))
        })?;

        tracing::debug!(url = %script_url, "Fetching version script");
        let script = self
            .http
            .get(script_url.clone())
            .send()
            .await
            .map_err(Error::transport)?
            .error_for_status()
            .map_err(Error::transport)?
            .text()
            .await
            .map_err(Error::transport)?;

        let version = extract_version(&script).ok_or_else(|| {
            Error::login_failed(format!(
                "failed to get JSON-RPC API version from {}",
                script_url
            ))
        })?;

        // Step 5 and 6: RPC URLs, then learn the login
        let mut session = Session::new(version, SessionUrls::from_landing(&landing)?);
        let account = self
            .send_rpc(&session, ACCOUNT_ENDPOINT, ACCOUNT_METHOD, json!({}))
            .await?;
        let user = account
            .get("login")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::unexpected(format!("{} returned no login: {}", ACCOUNT_METHOD, account))
            })?;
        session.identify(user);

        Ok(session)
    }

    /// Call `method` on `endpoint` (e.g. `domains/dns`)
    ///
    /// `params` must be a mapping; `null` and `[]` are sent as `{}`.
    pub async fn call(&self, endpoint: &str, method: &str, params: Value) -> Result<Value> {
        let session = self
            .state
            .read()
            .await
            .session()
            .cloned()
            .ok_or(Error::NotAuthenticated)?;

        self.send_rpc(&session, endpoint, method, params).await
    }

    async fn send_rpc(
        &self,
        session: &Session,
        endpoint: &str,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        let request = session.envelope(method, normalize_params(params)?);
        let url = session.urls.endpoint_url(endpoint);

        tracing::debug!(endpoint, method, id = %request.id, "JSON-RPC call");

        let response = self
            .http
            .post(&url)
            .header(REFERER, session.urls.referrer.as_str())
            .header(ORIGIN, session.urls.origin.as_str())
            .header(ACCEPT, RPC_ACCEPT)
            .json(&request)
            .send()
            .await
            .map_err(Error::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::transport)?;

        match RpcResponse::from_body(&body) {
            Ok(parsed) => parsed.into_result().inspect_err(|e| {
                tracing::warn!(endpoint, method, error = %e, "JSON-RPC call failed");
            }),
            Err(_) if !status.is_success() => Err(Error::unexpected(format!(
                "HTTP {} from {}",
                status, url
            ))),
            Err(e) => Err(e),
        }
    }

    /// Current login state
    pub async fn login_state(&self) -> LoginState {
        self.state.read().await.clone()
    }

    /// Whether RPC calls are currently allowed
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session().is_some()
    }

    /// API version scraped at login
    pub async fn api_version(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session()
            .map(|session| session.version.clone())
    }

    /// Panel login reported after authentication
    pub async fn user(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session()
            .map(|session| session.user.clone())
    }

    /// Configured username
    pub fn username(&self) -> &str {
        &self.credentials.username
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("invalid URL {:?}: {}", raw, e)))
}
