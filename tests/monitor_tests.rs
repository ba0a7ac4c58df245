mod common;

use common::{ScriptedSource, fetch_failure, snap};
use roomwatch::monitor::PollError;
use roomwatch::source::{DISPLAY_TAIL_CAP, display_tail};
use roomwatch::{DeltaKind, Monitor, StateStore};
use tempfile::tempdir;

fn open_store(dir: &tempfile::TempDir) -> StateStore {
    StateStore::open(dir.path().join("state.json")).unwrap()
}

#[tokio::test]
async fn test_first_poll_reports_all_joins() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::lines(vec![vec![
        "1712000000.1,5,1,GroupJoin,Jam,alice",
        "1712000003.2,6,1,GroupJoin,Jam,bob",
    ]]);
    let monitor = Monitor::new(source, open_store(&dir));

    let outcome = monitor.poll().await.unwrap();
    assert_eq!(outcome.snapshot, snap(&[("Jam", &["alice", "bob"])]));
    assert_eq!(outcome.deltas.len(), 2);
    assert!(outcome.deltas.iter().all(|d| d.kind == DeltaKind::Joined));
}

#[tokio::test]
async fn test_identical_window_yields_no_deltas() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::lines(vec![vec!["1712000000.1,5,1,GroupJoin,Jam,alice"]]);
    let monitor = Monitor::new(source, open_store(&dir));

    let first = monitor.poll().await.unwrap();
    assert_eq!(first.deltas.len(), 1);

    // The script repeats the same window; nothing changed.
    let second = monitor.poll().await.unwrap();
    assert!(second.deltas.is_empty());
    assert_eq!(second.snapshot, first.snapshot);
}

#[tokio::test]
async fn test_poll_persists_across_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let store = StateStore::open(&path).unwrap();
        let source = ScriptedSource::lines(vec![vec![
            "1712000000.1,5,1,GroupJoin,Jam,alice",
            "1712000001.0,5,2,GroupJoin,Mix,bob",
        ]]);
        let monitor = Monitor::new(source, store);
        monitor.poll().await.unwrap();
        // monitor (and its store) dropped here
    }

    let store = StateStore::open(&path).unwrap();
    assert_eq!(
        store.snapshot(),
        &snap(&[("Jam", &["alice"]), ("Mix", &["bob"])])
    );
}

#[tokio::test]
async fn test_fetch_failure_leaves_published_state_unchanged() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::new(vec![
        Ok(vec!["1712000000.1,5,1,GroupJoin,Jam,alice".to_string()]),
        Err(fetch_failure()),
        Ok(vec![
            "1712000000.1,5,1,GroupJoin,Jam,alice".to_string(),
            "1712000090.4,7,1,GroupJoin,Jam,bob".to_string(),
        ]),
    ]);
    let monitor = Monitor::new(source, open_store(&dir));

    monitor.poll().await.unwrap();

    let err = monitor.poll().await.unwrap_err();
    assert!(matches!(err, PollError::Source(_)));
    assert_eq!(
        monitor.published_snapshot().await,
        snap(&[("Jam", &["alice"])])
    );

    // The failed cycle consumed nothing: the next poll diffs against the
    // last successfully published snapshot.
    let outcome = monitor.poll().await.unwrap();
    assert_eq!(outcome.deltas.len(), 1);
    assert_eq!(outcome.deltas[0].user, "bob");
}

#[tokio::test]
async fn test_observe_does_not_advance_published_state() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::lines(vec![
        vec!["1712000000.1,5,1,GroupJoin,Jam,alice"],
        vec![
            "1712000000.1,5,1,GroupJoin,Jam,alice",
            "1712000090.4,7,1,GroupJoin,Jam,bob",
        ],
    ]);
    let monitor = Monitor::new(source, open_store(&dir));

    monitor.poll().await.unwrap();

    let observed = monitor.observe().await.unwrap();
    assert_eq!(observed, snap(&[("Jam", &["alice", "bob"])]));

    // The observe above saw bob, but only poll() consumes deltas.
    let outcome = monitor.poll().await.unwrap();
    assert_eq!(outcome.deltas.len(), 1);
    assert_eq!(outcome.deltas[0].user, "bob");
}

#[tokio::test]
async fn test_display_handle_roundtrip() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::lines(vec![vec![]]);
    let monitor = Monitor::new(source, open_store(&dir));

    assert_eq!(monitor.display_handle().await, None);
    monitor.set_display_handle(Some("msg-9".to_string())).await;
    assert_eq!(monitor.display_handle().await, Some("msg-9".to_string()));
}

#[tokio::test]
async fn test_monitor_requests_its_window_size() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::lines(vec![vec![]]);
    let requested = source.requested.clone();
    let monitor = Monitor::new(source, open_store(&dir)).with_window(200);

    monitor.poll().await.unwrap();
    assert_eq!(*requested.lock().unwrap(), vec![200]);
}

#[tokio::test]
async fn test_display_tail_is_capped() {
    let source = ScriptedSource::lines(vec![vec!["line"]]);
    let requested = source.requested.clone();

    display_tail(&source, 500).await.unwrap();
    display_tail(&source, 20).await.unwrap();
    assert_eq!(*requested.lock().unwrap(), vec![DISPLAY_TAIL_CAP, 20]);
}

#[tokio::test]
async fn test_unparseable_window_is_empty_snapshot() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource::lines(vec![vec![
        "starting aooserver 2.1.0",
        "relay: forwarded 4096 bytes",
    ]]);
    let monitor = Monitor::new(source, open_store(&dir));

    let outcome = monitor.poll().await.unwrap();
    assert!(outcome.snapshot.is_empty());
    assert!(outcome.deltas.is_empty());
}
