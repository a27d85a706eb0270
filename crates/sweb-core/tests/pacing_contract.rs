//! Contract Test: Request Pacing
//!
//! Constraints verified:
//! - publish pauses once before its add
//! - cleanup pauses before its listing and before its delete
//! - a sweep of N records pauses 2N+1 times (one listing per round plus one per delete)
//!
//! Runs on tokio's paused clock with a jitter-free pacer, so elapsed virtual
//! time counts the pauses.

mod common;

use common::*;
use std::time::Duration;
use sweb_core::config::PacingConfig;
use sweb_core::{ChallengeEngine, Pacer};
use tokio::time::Instant;

const STEP: Duration = Duration::from_secs(2);

fn fixed_pacer() -> Pacer {
    Pacer::new(PacingConfig {
        base_secs: STEP.as_secs_f64(),
        jitter: 0.0,
    })
}

fn paced_engine(zone: MemoryZone, drop_stale_records: bool) -> ChallengeEngine {
    let (engine, _events) =
        ChallengeEngine::new(Box::new(zone), unpaced_config(drop_stale_records))
            .expect("valid config");
    engine.with_pacer(fixed_pacer())
}

fn assert_pauses(elapsed: Duration, pauses: u32) {
    let expected = STEP * pauses;
    assert!(
        elapsed >= expected && elapsed < expected + STEP,
        "expected {} pauses ({:?}), got {:?}",
        pauses,
        expected,
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn publish_pauses_before_the_add() {
    let mut engine = paced_engine(MemoryZone::new(), false);

    let started = Instant::now();
    engine
        .publish("example.com", "_acme-challenge.example.com", "tok")
        .await
        .expect("publish succeeds");

    assert_pauses(started.elapsed(), 1);
}

#[tokio::test(start_paused = true)]
async fn cleanup_pauses_before_list_and_delete() {
    let zone = MemoryZone::with_records(vec![txt("_acme-challenge", "tok", 1)]);
    let mut engine = paced_engine(zone, false);

    let started = Instant::now();
    let removed = engine
        .cleanup("example.com", "_acme-challenge.example.com", "tok")
        .await
        .expect("cleanup succeeds");

    assert!(removed);
    assert_pauses(started.elapsed(), 2);
}

#[tokio::test(start_paused = true)]
async fn cleanup_without_match_pauses_once() {
    let mut engine = paced_engine(MemoryZone::new(), false);

    let started = Instant::now();
    engine
        .cleanup("example.com", "_acme-challenge.example.com", "tok")
        .await
        .expect("cleanup succeeds");

    assert_pauses(started.elapsed(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweep_pauses_before_every_listing_and_delete() {
    let zone = MemoryZone::with_records(vec![
        txt("_acme-challenge", "a", 1),
        txt("_acme-challenge", "b", 2),
        txt("_acme-challenge", "c", 3),
    ]);
    let mut engine = paced_engine(zone, true);

    let started = Instant::now();
    let removed = engine
        .drop_stale("example.com", "_acme-challenge.example.com")
        .await
        .expect("sweep succeeds");

    assert_eq!(removed, 3);
    assert_pauses(started.elapsed(), 2 * 3 + 1);
}

#[tokio::test(start_paused = true)]
async fn publish_with_sweep_adds_one_pause_for_the_add() {
    let zone = MemoryZone::with_records(vec![txt("_acme-challenge", "stale", 1)]);
    let mut engine = paced_engine(zone, true);

    let started = Instant::now();
    let outcome = engine
        .publish("example.com", "_acme-challenge.example.com", "fresh")
        .await
        .expect("publish succeeds");

    assert_eq!(outcome.stale_removed, 1);
    // One sweep round trip, the final empty listing, then the add
    assert_pauses(started.elapsed(), 4);
}
