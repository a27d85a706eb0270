//! Typed wrappers over the panel's RPC endpoints
//!
//! Only the DNS calls the challenge flow needs are wrapped here; certificate
//! management lives in [`crate::ssl`]. Anything else can go through
//! [`SwebApi::jsonrpc`].

use crate::client::SwebClient;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::time::Duration;
use sweb_core::record::{DnsRecord, RecordType, TxtEdit, find_matching, wire_label};
use sweb_core::traits::DnsZone;
use sweb_core::{Error, Result};

/// Endpoint serving zone records
pub const DNS_ENDPOINT: &str = "domains/dns";

/// Pause between two certificate removals
pub const DEFAULT_SSL_REMOVAL_GAP: Duration = Duration::from_secs(3);

/// SpaceWeb panel API
#[derive(Debug)]
pub struct SwebApi {
    client: SwebClient,
    pub(crate) ssl_removal_gap: Duration,
}

impl SwebApi {
    /// Wrap a client; it may or may not be logged in yet
    pub fn new(client: SwebClient) -> Self {
        Self {
            client,
            ssl_removal_gap: DEFAULT_SSL_REMOVAL_GAP,
        }
    }

    /// Override the pause between certificate removals
    pub fn with_ssl_removal_gap(mut self, gap: Duration) -> Self {
        self.ssl_removal_gap = gap;
        self
    }

    /// Underlying session client
    pub fn client(&self) -> &SwebClient {
        &self.client
    }

    /// Raw JSON-RPC call
    pub async fn jsonrpc(&self, endpoint: &str, method: &str, params: Value) -> Result<Value> {
        self.client.call(endpoint, method, params).await
    }

    /// List every record of `domain`
    pub async fn domains_dns_info(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let result = self
            .jsonrpc(DNS_ENDPOINT, "info", json!({ "domain": domain }))
            .await?;

        if !result.is_array() {
            return Err(Error::unexpected(format!(
                "domains/dns info returned a non-list result for {}: {}",
                domain, result
            )));
        }

        serde_json::from_value(result).map_err(|e| {
            Error::unexpected(format!("malformed DNS record for {}: {}", domain, e))
        })
    }

    /// Records of `domain` matching `subdomain` and `record_type`
    ///
    /// When `listing` is given no request is made; it is filtered as-is.
    pub async fn domains_dns_info_find(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
        listing: Option<&[DnsRecord]>,
    ) -> Result<Vec<DnsRecord>> {
        match listing {
            Some(records) => Ok(find_matching(records, subdomain, record_type)),
            None => {
                let records = self.domains_dns_info(domain).await?;
                Ok(find_matching(&records, subdomain, record_type))
            }
        }
    }

    /// Add, edit or delete a TXT record
    pub async fn domains_dns_edit_txt(&self, domain: &str, edit: &TxtEdit) -> Result<Value> {
        tracing::debug!(
            domain,
            action = edit.action(),
            subdomain = edit.subdomain(),
            "Editing TXT record"
        );
        self.jsonrpc(DNS_ENDPOINT, "editTxt", edit_txt_params(domain, edit))
            .await
    }
}

/// Params of `domains/dns` `editTxt`
///
/// The apex is always sent as `@`, and deletions carry `type: "TXT"`.
pub fn edit_txt_params(domain: &str, edit: &TxtEdit) -> Value {
    let mut params = Map::new();
    params.insert("domain".into(), json!(domain));
    params.insert("action".into(), json!(edit.action()));
    params.insert("subDomain".into(), json!(wire_label(edit.subdomain())));

    match edit {
        TxtEdit::Add { value, .. } => {
            params.insert("value".into(), json!(value));
        }
        TxtEdit::Edit { value, index, .. } => {
            params.insert("value".into(), json!(value));
            params.insert("index".into(), index.as_value().clone());
        }
        TxtEdit::Delete { index, .. } => {
            params.insert("index".into(), index.as_value().clone());
            params.insert("type".into(), json!(RecordType::Txt.as_str()));
        }
    }

    Value::Object(params)
}

#[async_trait]
impl DnsZone for SwebApi {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        self.domains_dns_info(domain).await
    }

    async fn find_records(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        self.domains_dns_info_find(domain, subdomain, record_type, None)
            .await
    }

    async fn edit_txt(&self, domain: &str, edit: TxtEdit) -> Result<Value> {
        self.domains_dns_edit_txt(domain, &edit).await
    }

    fn zone_name(&self) -> &'static str {
        "sweb"
    }
}
