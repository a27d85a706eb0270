//! Authenticated panel session
//!
//! A `Session` only exists once the login sequence has scraped an API
//! version; its absence is what makes RPC calls fail with `NotAuthenticated`.

use crate::rpc::{RpcRequest, generate_request_id};
use chrono::{Local, NaiveDateTime};
use reqwest::Url;
use serde_json::{Map, Value};
use sweb_core::{Error, Result};

/// URLs derived from the post-login landing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUrls {
    /// `{origin}/`, prefix of every RPC endpoint
    pub rpc_base: String,
    /// Sent as the `Origin` header
    pub origin: String,
    /// `{origin}/main`, sent as the `Referer` header
    pub referrer: String,
}

impl SessionUrls {
    /// Derive the RPC URLs from the landing page URL
    pub fn from_landing(landing: &Url) -> Result<Self> {
        let origin = landing.origin();
        if !origin.is_tuple() {
            return Err(Error::login_failed(format!(
                "landing URL {} has no usable origin",
                landing
            )));
        }
        let origin = origin.ascii_serialization();

        Ok(Self {
            rpc_base: format!("{}/", origin),
            referrer: format!("{}/main", origin),
            origin,
        })
    }

    /// Full URL of an RPC endpoint such as `domains/dns`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.rpc_base, endpoint.trim_start_matches('/'))
    }
}

/// State captured by a successful login
#[derive(Debug, Clone)]
pub struct Session {
    /// API version scraped from the panel's script bundle
    pub version: String,
    /// Panel login; empty until the account lookup returns
    pub user: String,
    /// Local time of the login, embedded in every request id
    pub logged_in_at: NaiveDateTime,
    /// Endpoint URLs
    pub urls: SessionUrls,
}

impl Session {
    /// Start a session that knows its version but not yet its user
    pub fn new(version: impl Into<String>, urls: SessionUrls) -> Self {
        Self {
            version: version.into(),
            user: String::new(),
            logged_in_at: Local::now().naive_local(),
            urls,
        }
    }

    /// Record the login and reset the request id timestamp
    pub fn identify(&mut self, user: impl Into<String>) {
        self.user = user.into();
        self.logged_in_at = Local::now().naive_local();
    }

    /// Build the envelope for one call
    pub fn envelope(&self, method: &str, params: Map<String, Value>) -> RpcRequest {
        let id = generate_request_id(&self.logged_in_at, &mut rand::thread_rng());
        RpcRequest::new(&self.version, id, &self.user, method, params)
    }
}
