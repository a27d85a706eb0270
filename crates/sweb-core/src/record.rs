// # Zone Records
//
// The panel's `domains/dns` listing returns heterogeneous mappings whose
// shape depends on a `category` field. This module turns each mapping into a
// tagged `DnsRecord` once, at the boundary, and implements the matching rules
// used to find "the records for (subdomain, type)".
//
// ## Category table
//
// | Category    | Types              | Label field |
// |-------------|--------------------|-------------|
// | zoneMain    | A, AAAA (apex/www) | name        |
// | subdom      | A, AAAA, CNAME     | name        |
// | mx          | MX                 | name        |
// | mainTxt     | TXT (apex)         | domain      |
// | subdomTxt   | TXT (subdomain)    | domain      |
//
// Any other category (SRV, ...) is kept as `DnsRecord::Other` and never matches.
//
// ## Apex labels
//
// The zone apex appears both as `""` and as `"@"` in server data. Both
// spellings form one equivalence class on every comparison.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Label written for the zone apex
pub const APEX_LABEL: &str = "@";

/// DNS record types this client queries for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchanger
    Mx,
    /// Text record
    Txt,
}

impl RecordType {
    /// Wire spelling of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "MX" => Ok(RecordType::Mx),
            "TXT" => Ok(RecordType::Txt),
            _ => Err(Error::invalid_input(format!("Unsupported record type: {}", s))),
        }
    }
}

/// Opaque per-record identifier used by edit and delete calls
///
/// Only meaningful within the listing it was read from. It is passed back to
/// the panel verbatim and never interpreted or cached across listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordIndex(Value);

impl RecordIndex {
    /// Wrap a raw index value as returned by the panel
    pub fn new(raw: impl Into<Value>) -> Self {
        Self(raw.into())
    }

    /// The raw value
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for RecordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// A/AAAA/CNAME/MX entry (label field `name`)
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    /// Record type as sent by the panel
    pub record_type: Option<String>,
    /// Subdomain label
    pub name: String,
    /// Record content, when present
    pub value: Option<String>,
    /// Identifier for edit/delete, when the panel sent one
    pub index: Option<RecordIndex>,
    /// The mapping as received
    pub raw: Value,
}

/// TXT entry (label field `domain`)
#[derive(Debug, Clone, PartialEq)]
pub struct TxtRecord {
    /// Subdomain label
    pub domain: String,
    /// TXT content
    pub value: String,
    /// Identifier for edit/delete, when the panel sent one
    pub index: Option<RecordIndex>,
    /// The mapping as received
    pub raw: Value,
}

/// One entry of a zone listing, discriminated by its `category`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum DnsRecord {
    /// `zoneMain`: A/AAAA at the apex or `www`
    ZoneMain(HostRecord),
    /// `subdom`: A/AAAA/CNAME for a subdomain
    Subdomain(HostRecord),
    /// `mx`: mail exchangers
    Mx(HostRecord),
    /// `mainTxt`: TXT at the apex
    MainTxt(TxtRecord),
    /// `subdomTxt`: TXT for a subdomain
    SubdomainTxt(TxtRecord),
    /// Any category this client does not manage
    Other {
        /// Category as sent by the panel
        category: String,
        /// The mapping as received
        raw: Value,
    },
}

impl TryFrom<Value> for DnsRecord {
    type Error = Error;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let object = raw
            .as_object()
            .ok_or_else(|| Error::unexpected(format!("Zone record is not a mapping: {}", raw)))?;

        let category = object
            .get("category")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::unexpected(format!("Zone record without category: {}", raw)))?
            .to_string();

        let record = match category.as_str() {
            "zoneMain" => DnsRecord::ZoneMain(host_record(raw)),
            "subdom" => DnsRecord::Subdomain(host_record(raw)),
            "mx" => DnsRecord::Mx(host_record(raw)),
            "mainTxt" => DnsRecord::MainTxt(txt_record(raw)),
            "subdomTxt" => DnsRecord::SubdomainTxt(txt_record(raw)),
            _ => DnsRecord::Other { category, raw },
        };

        Ok(record)
    }
}

fn host_record(raw: Value) -> HostRecord {
    HostRecord {
        record_type: string_field(&raw, "type"),
        name: string_field(&raw, "name").unwrap_or_default(),
        value: string_field(&raw, "value"),
        index: index_field(&raw),
        raw,
    }
}

fn txt_record(raw: Value) -> TxtRecord {
    TxtRecord {
        domain: string_field(&raw, "domain").unwrap_or_default(),
        value: string_field(&raw, "value").unwrap_or_default(),
        index: index_field(&raw),
        raw,
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

// A missing index only matters to the caller that edits the record
fn index_field(raw: &Value) -> Option<RecordIndex> {
    raw.get("index")
        .filter(|index| !index.is_null())
        .map(|index| RecordIndex(index.clone()))
}

impl DnsRecord {
    /// Category name as sent by the panel
    pub fn category(&self) -> &str {
        match self {
            DnsRecord::ZoneMain(_) => "zoneMain",
            DnsRecord::Subdomain(_) => "subdom",
            DnsRecord::Mx(_) => "mx",
            DnsRecord::MainTxt(_) => "mainTxt",
            DnsRecord::SubdomainTxt(_) => "subdomTxt",
            DnsRecord::Other { category, .. } => category.as_str(),
        }
    }

    /// Subdomain label, read from the field the category uses
    pub fn label(&self) -> Option<&str> {
        match self {
            DnsRecord::ZoneMain(r) | DnsRecord::Subdomain(r) | DnsRecord::Mx(r) => Some(r.name.as_str()),
            DnsRecord::MainTxt(r) | DnsRecord::SubdomainTxt(r) => Some(r.domain.as_str()),
            DnsRecord::Other { .. } => None,
        }
    }

    /// Record content
    pub fn value(&self) -> Option<&str> {
        match self {
            DnsRecord::ZoneMain(r) | DnsRecord::Subdomain(r) | DnsRecord::Mx(r) => {
                r.value.as_deref()
            }
            DnsRecord::MainTxt(r) | DnsRecord::SubdomainTxt(r) => Some(r.value.as_str()),
            DnsRecord::Other { .. } => None,
        }
    }

    /// Identifier for edit/delete calls
    pub fn index(&self) -> Option<&RecordIndex> {
        match self {
            DnsRecord::ZoneMain(r) | DnsRecord::Subdomain(r) | DnsRecord::Mx(r) => r.index.as_ref(),
            DnsRecord::MainTxt(r) | DnsRecord::SubdomainTxt(r) => r.index.as_ref(),
            DnsRecord::Other { .. } => None,
        }
    }

    /// The mapping as received
    pub fn raw(&self) -> &Value {
        match self {
            DnsRecord::ZoneMain(r) | DnsRecord::Subdomain(r) | DnsRecord::Mx(r) => &r.raw,
            DnsRecord::MainTxt(r) | DnsRecord::SubdomainTxt(r) => &r.raw,
            DnsRecord::Other { raw, .. } => raw,
        }
    }

    /// Check whether the category can hold records of `record_type`
    fn serves(&self, record_type: RecordType) -> bool {
        match self {
            DnsRecord::ZoneMain(r) | DnsRecord::Subdomain(r) => {
                r.record_type.as_deref() == Some(record_type.as_str())
            }
            DnsRecord::Mx(_) => record_type == RecordType::Mx,
            DnsRecord::MainTxt(_) | DnsRecord::SubdomainTxt(_) => record_type == RecordType::Txt,
            DnsRecord::Other { .. } => false,
        }
    }

    /// Check whether this record is one of the `(subdomain, record_type)` records
    pub fn matches(&self, subdomain: &str, record_type: RecordType) -> bool {
        if !self.serves(record_type) {
            return false;
        }
        self.label()
            .is_some_and(|label| labels_match(label, subdomain))
    }
}

/// Check whether a label denotes the zone apex (`""` or `"@"`)
pub fn is_apex(label: &str) -> bool {
    label.is_empty() || label == APEX_LABEL
}

/// Compare a record label against a requested subdomain, folding apex spellings
pub fn labels_match(label: &str, subdomain: &str) -> bool {
    label == subdomain || (is_apex(subdomain) && is_apex(label))
}

/// Label to send on writes; the panel rejects the empty spelling there
pub fn wire_label(subdomain: &str) -> &str {
    if subdomain.is_empty() { APEX_LABEL } else { subdomain }
}

/// Select the records matching `(subdomain, record_type)`, keeping listing order
pub fn find_matching<'a, I>(records: I, subdomain: &str, record_type: RecordType) -> Vec<DnsRecord>
where
    I: IntoIterator<Item = &'a DnsRecord>,
{
    records
        .into_iter()
        .filter(|record| record.matches(subdomain, record_type))
        .cloned()
        .collect()
}

/// A TXT mutation
///
/// `Add` never carries an index; `Edit` and `Delete` always do.
#[derive(Debug, Clone, PartialEq)]
pub enum TxtEdit {
    /// Create a new TXT record
    Add {
        /// Subdomain label
        subdomain: String,
        /// TXT content
        value: String,
    },
    /// Replace the content of an existing TXT record
    Edit {
        /// Subdomain label
        subdomain: String,
        /// New TXT content
        value: String,
        /// Record to change
        index: RecordIndex,
    },
    /// Delete an existing TXT record
    Delete {
        /// Subdomain label
        subdomain: String,
        /// Record to delete
        index: RecordIndex,
    },
}

impl TxtEdit {
    /// Wire spelling of the action
    pub fn action(&self) -> &'static str {
        match self {
            TxtEdit::Add { .. } => "add",
            TxtEdit::Edit { .. } => "edit",
            TxtEdit::Delete { .. } => "del",
        }
    }

    /// Subdomain label the edit applies to
    pub fn subdomain(&self) -> &str {
        match self {
            TxtEdit::Add { subdomain, .. }
            | TxtEdit::Edit { subdomain, .. }
            | TxtEdit::Delete { subdomain, .. } => subdomain,
        }
    }
}
