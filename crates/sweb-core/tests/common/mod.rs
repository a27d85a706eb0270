//! Test doubles and common utilities for engine contract tests
//!
//! This module provides an in-memory zone that behaves like the panel's
//! `domains/dns` endpoints closely enough to exercise the engine.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sweb_core::config::{ChallengeConfig, PacingConfig};
use sweb_core::error::{Error, Result};
use sweb_core::record::{DnsRecord, TxtEdit, is_apex};
use sweb_core::traits::DnsZone;

/// An in-memory zone that records every call
pub struct MemoryZone {
    /// Raw records as the panel would list them
    records: Arc<Mutex<Vec<Value>>>,
    /// Next index handed out on add
    next_index: Arc<AtomicUsize>,
    /// Call counter for list_records()
    list_call_count: Arc<AtomicUsize>,
    /// Every edit received, in order
    edits: Arc<Mutex<Vec<TxtEdit>>>,
    /// Fail every add with an RPC error
    fail_adds: bool,
    /// Answer deletes with `0` and keep the record
    refuse_deletes: bool,
}

impl MemoryZone {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            next_index: Arc::new(AtomicUsize::new(100)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            edits: Arc::new(Mutex::new(Vec::new())),
            fail_adds: false,
            refuse_deletes: false,
        }
    }

    /// Create a zone pre-populated with raw records
    pub fn with_records(records: Vec<Value>) -> Self {
        let zone = Self::new();
        *zone.records.lock().unwrap() = records;
        zone
    }

    /// Create a zone that rejects every add
    pub fn failing_adds(mut self) -> Self {
        self.fail_adds = true;
        self
    }

    /// Create a zone that answers deletes with a falsy status and keeps the record
    pub fn refusing_deletes(mut self) -> Self {
        self.refuse_deletes = true;
        self
    }

    /// Create a new MemoryZone that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            next_index: Arc::clone(&other.next_index),
            list_call_count: Arc::clone(&other.list_call_count),
            edits: Arc::clone(&other.edits),
            fail_adds: other.fail_adds,
            refuse_deletes: other.refuse_deletes,
        }
    }

    /// TXT values currently stored at `label`, in listing order
    pub fn txt_values(&self, label: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches!(r["category"].as_str(), Some("mainTxt" | "subdomTxt")))
            .filter(|r| r["domain"] == label)
            .filter_map(|r| r["value"].as_str().map(str::to_string))
            .collect()
    }

    /// Every raw record currently stored
    pub fn raw_records(&self) -> Vec<Value> {
        self.records.lock().unwrap().clone()
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get every edit received so far
    pub fn edits(&self) -> Vec<TxtEdit> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsZone for MemoryZone {
    async fn list_records(&self, _domain: &str) -> Result<Vec<DnsRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(DnsRecord::try_from)
            .collect()
    }

    async fn edit_txt(&self, _domain: &str, edit: TxtEdit) -> Result<Value> {
        self.edits.lock().unwrap().push(edit.clone());
        let mut records = self.records.lock().unwrap();

        match edit {
            TxtEdit::Add { subdomain, value } => {
                if self.fail_adds {
                    return Err(Error::rpc(-32000, "add rejected", None));
                }
                let category = if is_apex(&subdomain) { "mainTxt" } else { "subdomTxt" };
                let index = self.next_index.fetch_add(1, Ordering::SeqCst);
                records.push(json!({
                    "category": category,
                    "domain": subdomain,
                    "value": value,
                    "index": index,
                }));
            }
            TxtEdit::Edit { value, index, .. } => {
                let record = records
                    .iter_mut()
                    .find(|r| r["index"] == *index.as_value())
                    .ok_or_else(|| Error::rpc(-32001, "no such record", None))?;
                record["value"] = json!(value);
            }
            TxtEdit::Delete { .. } if self.refuse_deletes => return Ok(json!(0)),
            TxtEdit::Delete { index, .. } => {
                let position = records
                    .iter()
                    .position(|r| r["index"] == *index.as_value())
                    .ok_or_else(|| Error::rpc(-32001, "no such record", None))?;
                records.remove(position);
            }
        }

        Ok(json!(1))
    }

    fn zone_name(&self) -> &'static str {
        "memory"
    }
}

/// A TXT record under `label`
pub fn txt(label: &str, value: &str, index: u64) -> Value {
    let category = if is_apex(label) { "mainTxt" } else { "subdomTxt" };
    json!({"category": category, "domain": label, "value": value, "index": index})
}

/// Helper to create a ChallengeConfig that never sleeps
pub fn unpaced_config(drop_stale_records: bool) -> ChallengeConfig {
    ChallengeConfig {
        drop_stale_records,
        propagation_seconds: 1200,
        pacing: PacingConfig::disabled(),
    }
}
