// # DNS Zone Trait
//
// Defines the interface the challenge engine uses to read and change a zone.
//
// ## Implementations
//
// - SpaceWeb control panel: `SwebApi` in the `sweb-client` crate
// - In-memory zones in tests
//
// ## Usage
//
// ```rust,ignore
// use sweb_core::{DnsZone, RecordType, TxtEdit};
//
// async fn publish(zone: &dyn DnsZone) -> sweb_core::Result<()> {
//     zone.edit_txt("example.com", TxtEdit::Add {
//         subdomain: "_acme-challenge".to_string(),
//         value: "token".to_string(),
//     }).await?;
//
//     let found = zone.find_records("example.com", "_acme-challenge", RecordType::Txt).await?;
//     assert!(!found.is_empty());
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::record::{DnsRecord, RecordType, TxtEdit, find_matching};

/// Trait for zone implementations
///
/// # Consistency
///
/// There is no atomic read-modify-write: every `index` returned by
/// [`DnsZone::list_records`] is only valid for that listing, and callers
/// re-list after every mutation.
///
/// # Retries
///
/// Implementations return errors as they happen and never retry on their own.
#[async_trait]
pub trait DnsZone: Send + Sync {
    /// List every record of a zone, in server order
    ///
    /// # Parameters
    ///
    /// - `domain`: The zone apex (e.g., "example.com")
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// List the records matching `(subdomain, record_type)`
    ///
    /// `""` and `"@"` both select the zone apex.
    async fn find_records(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>, crate::Error> {
        let records = self.list_records(domain).await?;
        Ok(find_matching(&records, subdomain, record_type))
    }

    /// Add, edit or delete a TXT record
    ///
    /// # Returns
    ///
    /// The panel's raw status value. Anything truthy means success.
    async fn edit_txt(&self, domain: &str, edit: TxtEdit)
    -> Result<serde_json::Value, crate::Error>;

    /// Get the zone implementation name (for logging/debugging)
    fn zone_name(&self) -> &'static str;
}
