//! DNS-01 challenge engine
//!
//! The ChallengeEngine is responsible for:
//! - Publishing a TXT record per validation token
//! - Optionally sweeping TXT records left behind by earlier runs
//! - Removing exactly one TXT record per token once validation is over
//! - Pacing every request to the zone
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ ACME caller  │── (domain, validation name, token) ──┐
//! └──────────────┘                                      │
//!                                                       ▼
//!                                            ┌──────────────────┐
//!                                            │ ChallengeEngine  │
//!                                            └──────────────────┘
//!                                                       │
//!         ┌─────────────────────────────┬───────────────┴─────────────┐
//!         │                             │                             │
//!         ▼                             ▼                             ▼
//! ┌───────────────┐           ┌──────────────────┐           ┌─────────────┐
//! │ChallengeTokens│           │     DnsZone      │           │   Events    │
//! │ (owned set)   │           │ (list / edit)    │           │  (notify)   │
//! └───────────────┘           └──────────────────┘           └─────────────┘
//! ```
//!
//! ## Challenge lifecycle
//!
//! `Idle → [DroppingStale] → Publishing → Published → Cleaning → Done`
//!
//! Multi-step operations are not transactional. If a delete succeeds and the
//! following add fails, the zone keeps the deletion; callers retry the whole
//! operation.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ChallengeConfig;
use crate::error::{Error, Result};
use crate::pacing::Pacer;
use crate::record::{APEX_LABEL, DnsRecord, RecordType, TxtEdit};
use crate::state::ChallengeTokens;
use crate::traits::DnsZone;

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the ChallengeEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A TXT record from an earlier run was deleted
    StaleRecordRemoved {
        domain: String,
        subdomain: String,
        value: String,
    },

    /// The challenge TXT record was added
    ChallengePublished {
        domain: String,
        subdomain: String,
        value: String,
    },

    /// The challenge TXT record was deleted
    ChallengeRemoved {
        domain: String,
        subdomain: String,
        value: String,
    },

    /// Cleanup found no TXT record carrying the token
    ChallengeNotFound {
        domain: String,
        subdomain: String,
        value: String,
    },
}

/// Where a challenge is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    /// Not started
    Idle,
    /// Sweeping TXT records from earlier runs
    DroppingStale,
    /// Adding the TXT record
    Publishing,
    /// TXT record added
    Published,
    /// Removing the TXT record
    Cleaning,
    /// Cleanup finished
    Done,
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Label the TXT record was written under
    pub subdomain: String,
    /// Number of stale TXT records removed first
    pub stale_removed: usize,
}

type ChallengeKey = (String, String, String);

fn challenge_key(domain: &str, validation_name: &str, token: &str) -> ChallengeKey {
    (
        domain.to_string(),
        validation_name.to_string(),
        token.to_string(),
    )
}

/// DNS-01 challenge engine
///
/// Requests to the zone are strictly sequential: every step awaits the
/// previous one, and the pacer sleeps before each request.
///
/// ## Lifecycle
///
/// 1. Create with [`ChallengeEngine::new()`]
/// 2. Call [`ChallengeEngine::publish()`] per challenge
/// 3. Call [`ChallengeEngine::cleanup()`] per challenge once validation is over
/// 4. Drop
pub struct ChallengeEngine {
    /// Zone the challenges are written to
    zone: Box<dyn DnsZone>,

    /// Tokens published by this engine
    tokens: ChallengeTokens,

    /// Sleeps between requests
    pacer: Pacer,

    /// Sweep stale TXT records before publishing
    drop_stale_records: bool,

    /// Propagation hint for the caller (in seconds)
    propagation_seconds: u64,

    /// Lifecycle state per (domain, validation name, token)
    states: HashMap<ChallengeKey, ChallengeState>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ChallengeEngine {
    /// Create a new challenge engine
    ///
    /// # Parameters
    ///
    /// - `zone`: Zone implementation
    /// - `config`: Challenge configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        zone: Box<dyn DnsZone>,
        config: ChallengeConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            zone,
            tokens: ChallengeTokens::new(),
            pacer: Pacer::new(config.pacing),
            drop_stale_records: config.drop_stale_records,
            propagation_seconds: config.propagation_seconds,
            states: HashMap::new(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Replace the pacer
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Derive the subdomain label of a validation record
    ///
    /// `("example.com", "_acme-challenge.example.com")` gives `"_acme-challenge"`,
    /// a validation name equal to the zone gives `"@"`, and a name outside the
    /// zone is returned unchanged.
    pub fn challenge_subdomain(domain: &str, validation_name: &str) -> String {
        if validation_name == domain {
            return APEX_LABEL.to_string();
        }

        match validation_name
            .strip_suffix(domain)
            .and_then(|prefix| prefix.strip_suffix('.'))
        {
            Some("") => APEX_LABEL.to_string(),
            Some(prefix) => prefix.to_string(),
            None => validation_name.to_string(),
        }
    }

    /// Publish the TXT record for a challenge
    ///
    /// The token is recorded as owned first, then (when configured) stale
    /// records are swept, then a new TXT record is added. An identical
    /// existing record is not looked for; several TXT values at one name are
    /// valid DNS.
    ///
    /// # Parameters
    ///
    /// - `domain`: The zone apex (e.g., "example.com")
    /// - `validation_name`: Fully-qualified validation record name
    /// - `token`: TXT value to publish
    pub async fn publish(
        &mut self,
        domain: &str,
        validation_name: &str,
        token: &str,
    ) -> Result<PublishOutcome> {
        let key = challenge_key(domain, validation_name, token);
        self.tokens.record(token);

        let mut stale_removed = 0;
        if self.drop_stale_records {
            self.states.insert(key.clone(), ChallengeState::DroppingStale);
            stale_removed = self.drop_stale(domain, validation_name).await?;
        }

        let subdomain = Self::challenge_subdomain(domain, validation_name);
        self.states.insert(key.clone(), ChallengeState::Publishing);

        info!("Adding TXT record for {}", validation_name);
        self.pacer.pause().await;
        let status = self
            .zone
            .edit_txt(
                domain,
                TxtEdit::Add {
                    subdomain: subdomain.clone(),
                    value: token.to_string(),
                },
            )
            .await?;
        check_status(&status, "add", validation_name)?;

        self.states.insert(key, ChallengeState::Published);
        self.emit_event(EngineEvent::ChallengePublished {
            domain: domain.to_string(),
            subdomain: subdomain.clone(),
            value: token.to_string(),
        });

        Ok(PublishOutcome {
            subdomain,
            stale_removed,
        })
    }

    /// Delete every TXT record at the validation label not published by this engine
    ///
    /// Deletes one record per round and re-lists after every deletion, since
    /// the zone has no batch delete and may change between calls.
    ///
    /// # Returns
    ///
    /// The number of deleted records
    pub async fn drop_stale(&mut self, domain: &str, validation_name: &str) -> Result<usize> {
        let subdomain = Self::challenge_subdomain(domain, validation_name);
        let mut removed = 0;

        loop {
            self.pacer.pause().await;
            let stale: Vec<DnsRecord> = self
                .zone
                .find_records(domain, &subdomain, RecordType::Txt)
                .await?
                .into_iter()
                .filter(|record| !self.tokens.contains(record.value().unwrap_or_default()))
                .collect();

            let Some(record) = stale.last() else {
                break;
            };

            info!(
                "Removing outdated TXT record for {} ({} left)",
                validation_name,
                stale.len()
            );

            let index = record.index().cloned().ok_or_else(|| {
                Error::unexpected(format!("TXT record without index: {}", record.raw()))
            })?;
            let value = record.value().unwrap_or_default().to_string();

            self.pacer.pause().await;
            let status = self
                .zone
                .edit_txt(
                    domain,
                    TxtEdit::Delete {
                        subdomain: subdomain.clone(),
                        index,
                    },
                )
                .await?;
            check_status(&status, "del", validation_name)?;

            removed += 1;
            self.emit_event(EngineEvent::StaleRecordRemoved {
                domain: domain.to_string(),
                subdomain: subdomain.clone(),
                value,
            });
        }

        info!("Removed {} old TXT records", removed);
        Ok(removed)
    }

    /// Remove the TXT record of a challenge
    ///
    /// Only the first record carrying `token` is deleted. Duplicates stay:
    /// another run may have just published the same value.
    ///
    /// # Returns
    ///
    /// `true` if a record was deleted, `false` if none carried the token
    pub async fn cleanup(
        &mut self,
        domain: &str,
        validation_name: &str,
        token: &str,
    ) -> Result<bool> {
        let key = challenge_key(domain, validation_name, token);
        let subdomain = Self::challenge_subdomain(domain, validation_name);
        self.states.insert(key.clone(), ChallengeState::Cleaning);

        self.pacer.pause().await;
        let records = self
            .zone
            .find_records(domain, &subdomain, RecordType::Txt)
            .await?;

        let Some(record) = records.iter().find(|record| record.value() == Some(token)) else {
            warn!("No TXT record for {} carries the challenge token", validation_name);
            self.states.insert(key, ChallengeState::Done);
            self.emit_event(EngineEvent::ChallengeNotFound {
                domain: domain.to_string(),
                subdomain,
                value: token.to_string(),
            });
            return Ok(false);
        };

        let index = record.index().cloned().ok_or_else(|| {
            Error::unexpected(format!("TXT record without index: {}", record.raw()))
        })?;

        info!("Removing TXT record for {}", validation_name);
        self.pacer.pause().await;
        let status = self
            .zone
            .edit_txt(
                domain,
                TxtEdit::Delete {
                    subdomain: subdomain.clone(),
                    index,
                },
            )
            .await?;
        check_status(&status, "del", validation_name)?;

        self.states.insert(key, ChallengeState::Done);
        self.emit_event(EngineEvent::ChallengeRemoved {
            domain: domain.to_string(),
            subdomain,
            value: token.to_string(),
        });

        Ok(true)
    }

    /// Lifecycle state of a challenge
    pub fn state(&self, domain: &str, validation_name: &str, token: &str) -> ChallengeState {
        self.states
            .get(&challenge_key(domain, validation_name, token))
            .copied()
            .unwrap_or(ChallengeState::Idle)
    }

    /// Tokens published by this engine
    pub fn tokens(&self) -> &ChallengeTokens {
        &self.tokens
    }

    /// How long the caller should wait for DNS propagation (in seconds)
    pub fn propagation_seconds(&self) -> u64 {
        self.propagation_seconds
    }

    /// Name of the zone implementation
    pub fn zone_name(&self) -> &'static str {
        self.zone.zone_name()
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event");
        }
    }
}

/// Check the panel's status value for a TXT edit
///
/// The panel answers edits with an opaque status. A falsy answer to an add is
/// only logged. A falsy answer to a delete is an error: the record may still
/// be there, and the stale sweep would list it again.
fn check_status(status: &serde_json::Value, action: &str, validation_name: &str) -> Result<()> {
    if is_truthy(status) {
        debug!("TXT {} for {} returned {}", action, validation_name, status);
        return Ok(());
    }

    if action == "del" {
        return Err(Error::unexpected(format!(
            "TXT del for {} returned falsy status {}",
            validation_name, status
        )));
    }

    warn!(
        "TXT {} for {} returned falsy status {}",
        action, validation_name, status
    );
    Ok(())
}

fn is_truthy(status: &serde_json::Value) -> bool {
    match status {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}
