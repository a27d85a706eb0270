//! Login sequence helpers
//!
//! The panel has no API login. A session is obtained by replaying what a
//! browser does:
//!
//! 1. GET the auth page, which sets the `darksecret` cookie
//! 2. POST the login form, echoing the cookie as a form field
//! 3. Check that the redirect chain ended on a known landing page
//! 4. Find the version script on the landing page and scrape the API version
//! 5. Ask the API who we are
//!
//! The HTTP side lives in [`crate::client`]; this module holds the pure
//! parsing steps.

use crate::session::Session;
use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;
use sweb_core::{Error, Result};

/// Cookie set by the auth page and echoed back in the login form
pub const DARK_SECRET_COOKIE: &str = "darksecret";

static SCRIPT_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script[^>]+src="([^"]+)"[^>]*?>"#).expect("script regex is valid")
});

static VERSION_DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"return *"(1\..+?)""#).expect("version regex is valid"));

static VERSION_SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"return *'(1\..+?)'").expect("version regex is valid"));

/// Where the client is in the login sequence
#[derive(Debug, Clone, Default)]
pub enum LoginState {
    /// No login attempted yet
    #[default]
    Unauthenticated,
    /// Login in progress
    Authenticating,
    /// Logged in; RPC calls allowed
    Authenticated(Session),
    /// The last login attempt failed
    Failed(String),
}

impl LoginState {
    /// The session, if logged in
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Extract the dark secret from a `Cookie` header value
///
/// A missing cookie yields an empty string; the panel accepts that.
pub fn dark_secret_from_cookies(cookie_header: Option<&str>) -> String {
    cookie_header
        .into_iter()
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == DARK_SECRET_COOKIE)
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// `{origin}{path}` without query, fragment or trailing slash
pub fn normalize_location(url: &Url) -> String {
    let location = format!("{}{}", url.origin().ascii_serialization(), url.path());
    location.trim_end_matches('/').to_string()
}

/// Fail unless the login redirect chain ended on an allowed landing page
pub fn check_landing_url(landing: &Url, allowed: &[String]) -> Result<()> {
    let location = normalize_location(landing);
    let known = allowed
        .iter()
        .any(|candidate| candidate.trim_end_matches('/') == location);

    if known {
        Ok(())
    } else {
        Err(Error::login_failed(format!("unexpected redirect {}", landing)))
    }
}

/// Find the script whose `src` contains `marker`, resolved against `base`
pub fn find_version_script(html: &str, base: &Url, marker: &str) -> Option<Url> {
    SCRIPT_SRC
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|src| src.as_str())
        .find(|src| src.contains(marker))
        .and_then(|src| base.join(src).ok())
}

/// Scrape the API version from the script body
///
/// Looks for `return "1.xxx"` first and falls back to the single-quoted
/// form; when several match, the last one wins.
pub fn extract_version(script: &str) -> Option<String> {
    last_capture(&VERSION_DOUBLE_QUOTED, script)
        .or_else(|| last_capture(&VERSION_SINGLE_QUOTED, script))
}

fn last_capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures_iter(haystack)
        .filter_map(|caps| caps.get(1))
        .last()
        .map(|m| m.as_str().to_string())
}
