use keepnote_core::db::open_db;
use keepnote_core::{
    ChangeBroadcaster, ConditionalCache, NoteBody, NoteError, NoteEventKind, NoteFields,
    NoteService, OwnerId, SqliteNoteStore, SystemClock,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 4;
const ROUNDS: usize = 10;

fn owner() -> OwnerId {
    OwnerId::parse("alice").unwrap()
}

fn create_note(path: &Path) -> uuid::Uuid {
    let conn = open_db(path).unwrap();
    let service = NoteService::new(SqliteNoteStore::try_new(&conn).unwrap());
    service.create(&owner(), &NoteFields::new("start")).unwrap().id
}

#[test]
fn same_claim_from_two_connections_has_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let id = create_note(&path);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|writer| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = NoteService::new(SqliteNoteStore::try_new(&conn).unwrap());
                barrier.wait();
                service
                    .upsert(
                        Some(id),
                        &owner(),
                        &NoteBody::new(format!("writer {writer}")).with_id(id).with_version(1),
                        None,
                    )
                    .map(|outcome| outcome.into_note().version)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1, "results: {results:?}");
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(NoteError::Conflict { claimed: 1, current: 2, .. }))));
}

#[test]
fn retrying_writers_never_share_a_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retry.db");
    let id = create_note(&path);
    let cache = Arc::new(ConditionalCache::new());
    let broadcaster = Arc::new(ChangeBroadcaster::new());
    let subscription = broadcaster.subscribe(&owner());

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let cache = Arc::clone(&cache);
            let broadcaster = Arc::clone(&broadcaster);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let store = SqliteNoteStore::try_new(&conn).unwrap();
                let service = NoteService::with_shared(store, SystemClock, cache, broadcaster);
                let mut versions = Vec::new();
                while versions.len() < ROUNDS {
                    let current = service.get(id, &owner()).unwrap();
                    let body = NoteBody::new(format!("writer {writer}"))
                        .with_id(id)
                        .with_version(current.version);
                    match service.upsert(Some(id), &owner(), &body, None) {
                        Ok(outcome) => versions.push(outcome.into_note().version),
                        Err(NoteError::Conflict { .. }) => continue,
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                versions
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for version in handle.join().unwrap() {
            assert!(seen.insert(version), "version {version} accepted twice");
        }
    }

    let total = WRITERS * ROUNDS;
    assert_eq!(seen.len(), total);
    let expected: HashSet<i64> = (2..=(total as i64 + 1)).collect();
    assert_eq!(seen, expected);

    let events = subscription.drain();
    assert_eq!(events.len(), total);
    assert!(events.iter().all(|event| event.kind == NoteEventKind::Updated));
    let delivered: Vec<i64> = events
        .iter()
        .map(|event| event.note.as_ref().unwrap().version)
        .collect();
    assert!(
        delivered.windows(2).all(|pair| pair[0] < pair[1]),
        "events out of commit order: {delivered:?}"
    );
    assert!(cache.marker(&owner()).is_some());
}
