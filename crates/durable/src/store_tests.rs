// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::checkpoint::RunState;

fn sample(job: &str) -> Checkpoint {
    Checkpoint::new(JobId::new(job), "hash", 7)
}

#[yare::parameterized(
    plain = { "checkpoints" },
    underscore = { "_armada_v2" },
    mixed = { "Run_History1" },
)]
fn valid_identifiers(name: &str) {
    assert_eq!(validate_identifier(name).unwrap(), name);
}

#[yare::parameterized(
    empty = { "" },
    leading_digit = { "1table" },
    dash = { "check-points" },
    dot = { "a.b" },
    space = { "a b" },
    injection = { "t; DROP TABLE jobs" },
)]
fn invalid_identifiers(name: &str) {
    assert!(matches!(
        validate_identifier(name),
        Err(StoreError::InvalidIdentifier(_))
    ));
}

#[test]
fn memory_store_round_trips() {
    let store = MemoryStore::new();
    let cp = sample("job-1");

    assert!(store.load(&cp.job_id).unwrap().is_none());
    store.save(&cp).unwrap();
    assert_eq!(store.load(&cp.job_id).unwrap(), Some(cp.clone()));

    assert!(store.delete(&cp.job_id).unwrap());
    assert!(!store.delete(&cp.job_id).unwrap());
    assert!(store.load(&cp.job_id).unwrap().is_none());
}

#[test]
fn memory_store_save_is_an_upsert() {
    let store = MemoryStore::new();
    let mut cp = sample("job-1");
    store.save(&cp).unwrap();
    cp.state = RunState::Completed;
    store.save(&cp).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.load(&cp.job_id).unwrap().unwrap().state, RunState::Completed);
}

#[test]
fn file_store_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), "checkpoints").unwrap();
    let mut cp = sample("job-file");
    cp.variables.insert("k".to_string(), serde_json::json!([1, 2]));

    store.save(&cp).unwrap();
    assert_eq!(store.load(&cp.job_id).unwrap(), Some(cp.clone()));

    cp.state = RunState::Failed;
    cp.error = Some("boom".to_string());
    store.save(&cp).unwrap();
    assert_eq!(store.load(&cp.job_id).unwrap(), Some(cp.clone()));

    assert!(store.delete(&cp.job_id).unwrap());
    assert!(store.load(&cp.job_id).unwrap().is_none());
    assert!(!store.delete(&cp.job_id).unwrap());
}

#[test]
fn file_store_rejects_invalid_namespace() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        FileStore::open(dir.path(), "../escape"),
        Err(StoreError::InvalidIdentifier(_))
    ));
}

#[test]
fn file_store_hashes_hostile_job_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), "ns").unwrap();
    // A job id that would traverse directories if used as a path.
    let cp = sample("../../etc/passwd");
    store.save(&cp).unwrap();
    assert_eq!(store.load(&cp.job_id).unwrap(), Some(cp));

    // Everything stays inside the namespace directory.
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("ns")).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn file_store_distinct_jobs_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), "ns").unwrap();
    let a = sample("job-a");
    let b = sample("job-b");
    store.save(&a).unwrap();
    store.save(&b).unwrap();
    assert_eq!(store.load(&a.job_id).unwrap(), Some(a));
    assert_eq!(store.load(&b.job_id).unwrap(), Some(b));
}
