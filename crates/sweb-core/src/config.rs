//! Configuration types for the SpaceWeb DNS client
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwebConfig {
    /// Panel account credentials
    pub credentials: Credentials,

    /// Panel URLs used by the login sequence
    #[serde(default)]
    pub endpoints: PanelEndpoints,

    /// Challenge orchestration settings
    #[serde(default)]
    pub challenge: ChallengeConfig,
}

impl SwebConfig {
    /// Create a configuration for the given account with default settings
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            endpoints: PanelEndpoints::default(),
            challenge: ChallengeConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.credentials.validate()?;
        self.endpoints.validate()?;
        self.challenge.validate()?;
        Ok(())
    }
}

/// Panel account credentials
///
/// The `Debug` implementation never prints the password.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Panel login
    pub username: String,

    /// Panel password
    pub password: String,

    /// User-Agent header sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Credentials {
    /// Create credentials without a custom user agent
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            user_agent: None,
        }
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.username.is_empty() {
            return Err(crate::Error::config("SpaceWeb username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("SpaceWeb password cannot be empty"));
        }
        Ok(())
    }
}

/// Panel URLs and scraping markers used by the login sequence
///
/// None of these are a published contract; they are what the panel's web UI
/// does today and are kept configurable so a changed panel can be followed
/// without a new release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelEndpoints {
    /// Page that sets the anti-automation cookie
    #[serde(default = "default_auth_page_url")]
    pub auth_page_url: String,

    /// Form submission target
    #[serde(default = "default_auth_submit_url")]
    pub auth_submit_url: String,

    /// Value of the form's `to` field
    #[serde(default = "default_redirect_to")]
    pub redirect_to: String,

    /// Known post-login landing locations (origin + path)
    #[serde(default = "default_landing_urls")]
    pub landing_urls: Vec<String>,

    /// Substring identifying the script bundle that carries the API version
    #[serde(default = "default_version_script_marker")]
    pub version_script_marker: String,

    /// Transport timeout for every request (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for PanelEndpoints {
    fn default() -> Self {
        Self {
            auth_page_url: default_auth_page_url(),
            auth_submit_url: default_auth_submit_url(),
            redirect_to: default_redirect_to(),
            landing_urls: default_landing_urls(),
            version_script_marker: default_version_script_marker(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl PanelEndpoints {
    /// Validate the endpoint configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (name, url) in [
            ("auth_page_url", &self.auth_page_url),
            ("auth_submit_url", &self.auth_submit_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "{} must be an absolute HTTP(S) URL, got: {}",
                    name, url
                )));
            }
        }

        if self.landing_urls.is_empty() {
            return Err(crate::Error::config(
                "At least one post-login landing URL is required",
            ));
        }

        if self.version_script_marker.is_empty() {
            return Err(crate::Error::config("Version script marker cannot be empty"));
        }

        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }

        Ok(())
    }
}

fn default_auth_page_url() -> String {
    "https://mcp.sweb.ru/main/auth/".to_string()
}

fn default_auth_submit_url() -> String {
    "https://mcp.sweb.ru/main/auth_submit/".to_string()
}

fn default_redirect_to() -> String {
    "//mcp.sweb.ru/main/index/".to_string()
}

fn default_landing_urls() -> Vec<String> {
    vec![
        "https://cp.sweb.ru".to_string(),
        "https://mcp.sweb.ru/main/index".to_string(),
    ]
}

fn default_version_script_marker() -> String {
    "main~version.".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

/// Request pacing
///
/// Every RPC-issuing step of the orchestrator waits
/// `base_secs ± base_secs * jitter` first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Base delay (in seconds)
    #[serde(default = "default_pacing_base_secs")]
    pub base_secs: f64,

    /// Jitter as a fraction of the base delay
    #[serde(default = "default_pacing_jitter")]
    pub jitter: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_secs: default_pacing_base_secs(),
            jitter: default_pacing_jitter(),
        }
    }
}

impl PacingConfig {
    /// Pacing that never sleeps
    pub fn disabled() -> Self {
        Self {
            base_secs: 0.0,
            jitter: 0.0,
        }
    }

    /// Validate the pacing configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.base_secs.is_finite() || self.base_secs < 0.0 {
            return Err(crate::Error::config(format!(
                "Pacing base delay must be a non-negative number of seconds, got: {}",
                self.base_secs
            )));
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(crate::Error::config(format!(
                "Pacing jitter must be non-negative, got: {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

fn default_pacing_base_secs() -> f64 {
    5.0
}

fn default_pacing_jitter() -> f64 {
    1.15
}

/// Challenge orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Remove TXT records left by earlier runs before publishing
    #[serde(default)]
    pub drop_stale_records: bool,

    /// How long the caller should wait for DNS propagation (in seconds)
    ///
    /// Surfaced for the caller's scheduling; the engine never waits on it.
    #[serde(default = "default_propagation_seconds")]
    pub propagation_seconds: u64,

    /// Request pacing
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            drop_stale_records: false,
            propagation_seconds: default_propagation_seconds(),
            pacing: PacingConfig::default(),
        }
    }
}

impl ChallengeConfig {
    /// Validate the challenge configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.pacing.validate()
    }
}

fn default_propagation_seconds() -> u64 {
    1200
}
