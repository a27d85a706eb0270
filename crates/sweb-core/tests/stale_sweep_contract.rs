//! Contract Test: Stale Record Sweep
//!
//! Constraints verified:
//! - TXT values published by this engine survive the sweep
//! - Every other TXT value at the validation label is deleted
//! - The zone is re-listed after every single deletion
//! - Records at other labels and of other categories are untouched
//! - A refused delete stops the sweep

mod common;

use common::*;
use serde_json::json;
use sweb_core::{ChallengeEngine, Error};

#[tokio::test]
async fn sweep_removes_foreign_values_and_keeps_owned_ones() {
    let zone = MemoryZone::with_records(vec![
        txt("_acme-challenge", "A", 1),
        txt("_acme-challenge", "B", 2),
        txt("_acme-challenge", "C", 3),
    ]);
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(true)).expect("valid config");

    // "B" belongs to this run: publishing it records the token before the sweep
    engine
        .publish("example.com", "_acme-challenge.example.com", "B")
        .await
        .expect("publish succeeds");

    let values = observer.txt_values("_acme-challenge");
    assert_eq!(values, vec!["B", "B"], "A and C swept, B kept and re-added");
}

#[tokio::test]
async fn sweep_deletes_last_first_and_relists_each_time() {
    let zone = MemoryZone::with_records(vec![
        txt("_acme-challenge", "old-1", 1),
        txt("_acme-challenge", "old-2", 2),
        txt("_acme-challenge", "old-3", 3),
    ]);
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(true)).expect("valid config");

    let removed = engine
        .drop_stale("example.com", "_acme-challenge.example.com")
        .await
        .expect("sweep succeeds");

    assert_eq!(removed, 3);
    // One listing per deletion plus the final empty one
    assert_eq!(observer.list_call_count(), 4);

    let deleted: Vec<String> = observer
        .edits()
        .iter()
        .map(|edit| match edit {
            sweb_core::TxtEdit::Delete { index, .. } => index.to_string(),
            other => panic!("unexpected edit {:?}", other),
        })
        .collect();
    assert_eq!(deleted, vec!["3", "2", "1"]);
    assert!(observer.txt_values("_acme-challenge").is_empty());
}

#[tokio::test]
async fn sweep_leaves_other_labels_and_categories_alone() {
    let zone = MemoryZone::with_records(vec![
        json!({"category": "mx", "name": "@", "type": "MX", "value": "mx.example.com", "index": 10}),
        json!({"category": "srv", "name": "_sip._tcp", "value": "0 5 5060 sip", "index": 11}),
        txt("@", "v=spf1 -all", 12),
        txt("www", "unrelated", 13),
        txt("_acme-challenge", "stale", 14),
    ]);
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(true)).expect("valid config");

    let removed = engine
        .drop_stale("example.com", "_acme-challenge.example.com")
        .await
        .expect("sweep succeeds");

    assert_eq!(removed, 1);
    assert_eq!(observer.raw_records().len(), 4);
    assert_eq!(observer.txt_values("@"), vec!["v=spf1 -all"]);
    assert_eq!(observer.txt_values("www"), vec!["unrelated"]);
}

#[tokio::test]
async fn second_challenge_at_same_label_keeps_first_token() {
    let zone = MemoryZone::new();
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(true)).expect("valid config");

    // Wildcard and apex certificates share one validation name
    engine
        .publish("example.com", "_acme-challenge.example.com", "first")
        .await
        .expect("first publish succeeds");
    let outcome = engine
        .publish("example.com", "_acme-challenge.example.com", "second")
        .await
        .expect("second publish succeeds");

    assert_eq!(outcome.stale_removed, 0);
    assert_eq!(
        observer.txt_values("_acme-challenge"),
        vec!["first", "second"]
    );
}

#[tokio::test]
async fn sweep_is_skipped_unless_configured() {
    let zone = MemoryZone::with_records(vec![txt("_acme-challenge", "stale", 1)]);
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(false)).expect("valid config");

    engine
        .publish("example.com", "_acme-challenge.example.com", "fresh")
        .await
        .expect("publish succeeds");

    assert_eq!(
        observer.txt_values("_acme-challenge"),
        vec!["stale", "fresh"]
    );
    assert_eq!(observer.list_call_count(), 0, "publish alone never lists");
}

#[tokio::test]
async fn refused_delete_stops_the_sweep() {
    let zone = MemoryZone::with_records(vec![txt("_acme-challenge", "stale", 1)]).refusing_deletes();
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(true)).expect("valid config");

    let err = engine
        .drop_stale("example.com", "_acme-challenge.example.com")
        .await
        .expect_err("falsy delete status is reported");

    assert!(matches!(err, Error::UnexpectedResponse(_)));
    assert_eq!(observer.list_call_count(), 1);
    assert_eq!(observer.edits().len(), 1);
    assert_eq!(observer.txt_values("_acme-challenge"), vec!["stale"]);
}

#[tokio::test]
async fn unindexed_records_elsewhere_do_not_block_the_sweep() {
    let zone = MemoryZone::with_records(vec![
        json!({"category": "zoneMain", "name": "@", "type": "A", "value": "192.0.2.1"}),
        txt("_acme-challenge", "stale", 1),
    ]);
    let observer = MemoryZone::sharing_state_with(&zone);

    let (mut engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(true)).expect("valid config");

    let outcome = engine
        .publish("example.com", "_acme-challenge.example.com", "fresh")
        .await
        .expect("publish succeeds");

    assert_eq!(outcome.stale_removed, 1);
    assert_eq!(observer.txt_values("_acme-challenge"), vec!["fresh"]);
    assert_eq!(observer.raw_records().len(), 2);
}
