//! Integration tests for session persistence and export.

use chrono::{Duration, Utc};
use strainsense::recording::{export_points_csv, export_sessions_csv, ExportError};
use strainsense::storage::Database;
use strainsense::workouts::types::WorkoutSession;
use strainsense::workouts::WorkoutClassifier;
use strainsense::SessionStore;

fn record_session(samples: &[u16]) -> WorkoutSession {
    let mut classifier = WorkoutClassifier::with_defaults();
    classifier.resume();
    classifier.process_samples(samples);
    classifier.end_session(Utc::now()).0
}

#[test]
fn test_sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("sessions.db");

    let session = record_session(&[630, 620, 650]);
    {
        let mut store = SessionStore::open(&path).unwrap();
        store.add_session(session.clone()).unwrap();
    }

    let store = SessionStore::open(&path).unwrap();
    assert_eq!(store.sessions(), &[session]);
}

#[test]
fn test_store_orders_by_date_not_insertion() {
    let mut store = SessionStore::in_memory().unwrap();
    let mut older = record_session(&[700]);
    older.date = Utc::now() - Duration::hours(3);
    let newer = record_session(&[800]);

    store.add_session(newer.clone()).unwrap();
    store.add_session(older.clone()).unwrap();

    assert_eq!(store.sessions()[0].id, newer.id);
    assert_eq!(store.sessions()[1].id, older.id);
}

#[test]
fn test_delete_through_store_removes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.db");

    let mut store = SessionStore::open(&path).unwrap();
    store.add_session(record_session(&[700])).unwrap();
    store.add_session(record_session(&[710])).unwrap();
    assert_eq!(store.delete_at(&[0]).unwrap(), 1);

    let db = Database::open(&path).unwrap();
    assert_eq!(db.count_sessions().unwrap(), 1);
}

#[test]
fn test_export_recorded_session() {
    let session = record_session(&[630, 620, 650]);
    let csv = export_points_csv(&session).unwrap();
    assert_eq!(csv, "elapsed_ms,strain\n0,630\n100,650\n");

    let summary = export_sessions_csv(std::slice::from_ref(&session)).unwrap();
    assert!(summary.lines().nth(1).unwrap().starts_with(&session.id.to_string()));
}

#[test]
fn test_export_empty_session_fails() {
    let session = record_session(&[]);
    assert!(matches!(
        export_points_csv(&session),
        Err(ExportError::NoData)
    ));
}
