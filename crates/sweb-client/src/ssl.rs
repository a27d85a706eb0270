//! Certificate endpoints (`vh/ssl`)
//!
//! Not needed by the DNS-01 flow itself, but they let a deploy hook install
//! the issued certificate and clean up the ones it replaced.

use crate::api::SwebApi;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use sweb_core::{Error, Result};

/// Endpoint serving certificates
pub const SSL_ENDPOINT: &str = "vh/ssl";

/// Result of `installCertificate` asking the caller to repeat the call
pub const INSTALL_RETRY_CODE: i64 = 2;

/// Status the panel shows for certificates that are no longer in use
pub const INACTIVE_STATUS: &str = "не активен";

/// IP value selecting SNI-based installation
pub const SNI: &str = "sni";

/// Encode a PEM blob the way the panel's upload form does
pub fn certificate_data_url(pem: &[u8]) -> String {
    format!(
        "data:application/x-x509-ca-cert;base64,{}",
        STANDARD.encode(pem)
    )
}

/// Params of `installCertificate`
pub fn install_params(
    crt: &[u8],
    key: &[u8],
    ca_bundles: &[Vec<u8>],
    domain: Option<&str>,
    ip: &str,
) -> Value {
    let files: Vec<Value> = [("crt", crt), ("key", key)]
        .into_iter()
        .chain(ca_bundles.iter().map(|ca| ("ca-bundle", ca.as_slice())))
        .map(|(name, pem)| json!({ "name": name, "base64": certificate_data_url(pem) }))
        .collect();

    json!({
        "domain": domain.filter(|d| !d.is_empty()),
        "ip": ip,
        "files": files,
    })
}

/// Whether a certificate listing entry is inactive
pub fn is_inactive(certificate: &Value) -> bool {
    certificate
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.trim().to_lowercase() == INACTIVE_STATUS)
}

impl SwebApi {
    /// Certificate overview; its `list` member holds the certificates
    pub async fn vh_ssl_index(&self) -> Result<Value> {
        let result = self.jsonrpc(SSL_ENDPOINT, "index", json!({})).await?;
        if !result.is_object() {
            return Err(Error::unexpected(format!(
                "vh/ssl index returned a non-mapping result: {}",
                result
            )));
        }
        Ok(result)
    }

    /// IPs a certificate can be bound to
    pub async fn vh_ssl_get_customer_ips(&self) -> Result<Vec<Value>> {
        match self.jsonrpc(SSL_ENDPOINT, "getCustomerIps", json!({})).await? {
            Value::Array(ips) => Ok(ips),
            other => Err(Error::unexpected(format!(
                "vh/ssl getCustomerIps returned a non-list result: {}",
                other
            ))),
        }
    }

    /// Upload a certificate, its key and any CA bundles
    ///
    /// A result equal to [`INSTALL_RETRY_CODE`] means the call should be
    /// repeated; that is left to the caller.
    pub async fn vh_ssl_install_certificate(
        &self,
        crt: &[u8],
        key: &[u8],
        ca_bundles: &[Vec<u8>],
        domain: Option<&str>,
        ip: &str,
    ) -> Result<Value> {
        tracing::info!(domain = ?domain, ip, "Installing certificate");
        self.jsonrpc(
            SSL_ENDPOINT,
            "installCertificate",
            install_params(crt, key, ca_bundles, domain, ip),
        )
        .await
    }

    /// Remove one certificate
    pub async fn vh_ssl_remove_certificate(&self, certificate_id: &Value) -> Result<Value> {
        self.jsonrpc(
            SSL_ENDPOINT,
            "removeCertificate",
            json!({ "certificateId": certificate_id }),
        )
        .await
    }

    /// Remove every inactive certificate and return the removed entries
    ///
    /// `listing` defaults to the `list` member of [`vh_ssl_index`](Self::vh_ssl_index).
    /// Once something was removed, every further entry waits for the removal gap.
    pub async fn vh_ssl_delete_inactive_certificates(
        &self,
        listing: Option<Vec<Value>>,
    ) -> Result<Vec<Value>> {
        let listing = match listing {
            Some(listing) => listing,
            None => {
                let mut index = self.vh_ssl_index().await?;
                match index.get_mut("list").map(Value::take) {
                    Some(Value::Array(list)) => list,
                    other => {
                        return Err(Error::unexpected(format!(
                            "vh/ssl index has no certificate list: {:?}",
                            other
                        )));
                    }
                }
            }
        };

        let mut removed = Vec::new();
        for certificate in listing {
            if !removed.is_empty() {
                tokio::time::sleep(self.ssl_removal_gap).await;
            }
            if !is_inactive(&certificate) {
                continue;
            }

            let id = certificate.get("id").cloned().unwrap_or(Value::Null);
            tracing::info!(certificate_id = %id, "Removing inactive certificate");
            let result = self.vh_ssl_remove_certificate(&id).await?;
            if !matches!(result, Value::Bool(true)) && result.as_i64() != Some(1) {
                return Err(Error::unexpected(format!(
                    "failed to remove certificate {}: unexpected result {}",
                    id, result
                )));
            }
            removed.push(certificate);
        }

        Ok(removed)
    }
}
