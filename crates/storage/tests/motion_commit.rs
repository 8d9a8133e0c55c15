#![forbid(unsafe_code)]

use motion_core::ids::{CategoryId, MotionId};
use motion_core::{Motion, MotionError, VersioningPolicy, WorkflowRegistry};
use motion_storage::{
    CommitAction, CreateCategoryRequest, ListMotionsRequest, SqliteStore, StoreError,
};
use tempfile::TempDir;

fn open_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn scenario_a(
    store: &mut SqliteStore,
    registry: &WorkflowRegistry,
    policy: VersioningPolicy,
) -> Motion {
    let mut motion = Motion::new();
    motion.set_title("A");
    motion.set_text("B");
    motion.set_reason(Some("C".to_string()));
    store
        .commit_motion(&mut motion, registry, policy)
        .expect("first commit");
    motion
}

#[test]
fn first_commit_creates_version_one() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);

    let motion_id = motion.id().expect("saved");
    let ledger = store.ledger(motion_id);
    assert_eq!(ledger.count().expect("count"), 1);
    let version = ledger.last().expect("last").expect("one version");
    assert_eq!(ledger.version_number(&version).expect("number"), 1);
    assert_eq!(version.content.title, "A");
    assert_eq!(version.content.text, "B");
    assert_eq!(version.content.reason.as_deref(), Some("C"));

    assert_eq!(motion.state_id().map(|s| s.as_str()), Some("pub"));
    assert_eq!(motion.revision(), 1);
    assert!(motion.staged().is_empty());
}

#[test]
fn always_new_appends_and_carries_untouched_fields() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);

    motion.set_title("A2");
    let outcome = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("second commit");
    assert_eq!(outcome.action, CommitAction::Appended);

    let ledger = store.ledger(outcome.motion_id);
    assert_eq!(ledger.count().expect("count"), 2);
    let second = ledger.by_ordinal(2).expect("version 2");
    assert_eq!(second.content.title, "A2");
    assert_eq!(second.content.text, "B");
    assert_eq!(second.content.reason.as_deref(), Some("C"));
    assert_eq!(ledger.by_ordinal(1).expect("version 1").content.title, "A");
}

#[test]
fn update_existing_rewrites_last_version_in_place() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::UpdateExisting);
    let first_id = motion.last_version().expect("cached").id;

    motion.set_title("A2");
    let outcome = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::UpdateExisting)
        .expect("second commit");
    assert_eq!(outcome.action, CommitAction::Rewritten);

    let ledger = store.ledger(outcome.motion_id);
    assert_eq!(ledger.count().expect("count"), 1);
    let only = ledger.last().expect("last").expect("one version");
    assert_eq!(only.id, first_id);
    assert_eq!(only.content.title, "A2");
    assert_eq!(only.content.text, "B");
    assert_eq!(motion.title(), "A2");
}

#[test]
fn commit_without_changes_is_a_ledger_noop() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = Motion::new();
    motion.set_title("T");
    motion.set_text("X");

    let first = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("first");
    let second = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("second");
    assert_eq!(first.action, CommitAction::Appended);
    assert_eq!(second.action, CommitAction::Skipped);
    assert!(second.version.is_none());
    assert_eq!(second.revision, 2);
    assert_eq!(store.ledger(first.motion_id).count().expect("count"), 1);

    motion.set_title("T");
    let third = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("third");
    assert_eq!(third.action, CommitAction::Skipped);
    assert_eq!(store.ledger(first.motion_id).count().expect("count"), 1);
}

#[test]
fn empty_motion_still_gets_a_first_version() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = Motion::new();
    let outcome = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::UpdateExisting)
        .expect("commit");
    assert_eq!(outcome.action, CommitAction::Appended);
    let version = outcome.version.expect("synthesized version");
    assert_eq!(version.content.title, "");
    assert_eq!(version.content.reason, None);
}

#[test]
fn requested_version_appends_even_when_clean() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::UpdateExisting);

    motion.request_new_version();
    let outcome = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::UpdateExisting)
        .expect("snapshot commit");
    assert_eq!(outcome.action, CommitAction::Appended);
    assert!(!motion.new_version_requested());

    let ledger = store.ledger(outcome.motion_id);
    let versions = ledger.all().expect("all");
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].content, versions[1].content);
}

#[test]
fn version_numbers_follow_creation_order() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    for n in 2..=4 {
        motion.set_text(format!("text {n}"));
        store
            .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
            .expect("commit");
    }
    // A second motion interleaves ids without affecting the first ledger.
    scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    motion.set_text("text 5");
    store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("commit");

    let ledger = store.ledger(motion.id().expect("saved"));
    let numbers = ledger
        .all()
        .expect("all")
        .iter()
        .map(|version| ledger.version_number(version).expect("number"))
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(ledger.by_ordinal(5).expect("v5").content.text, "text 5");
}

#[test]
fn by_ordinal_rejects_out_of_range() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    let ledger = store.ledger(motion.id().expect("saved"));

    for ordinal in [0, 2] {
        match ledger.by_ordinal(ordinal) {
            Err(StoreError::Motion(MotionError::Range { ordinal: got, count })) => {
                assert_eq!(got, ordinal);
                assert_eq!(count, 1);
            }
            other => panic!("expected range error, got {other:?}"),
        }
    }
}

#[test]
fn stale_motion_is_rejected_without_touching_the_ledger() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    let motion_id = motion.id().expect("saved");

    let mut first = store.load_motion(motion_id).expect("load first");
    let mut second = store.load_motion(motion_id).expect("load second");

    first.set_title("from first");
    store
        .commit_motion(&mut first, &registry, VersioningPolicy::AlwaysNew)
        .expect("first wins");

    second.set_title("from second");
    let err = store
        .commit_motion(&mut second, &registry, VersioningPolicy::AlwaysNew)
        .expect_err("stale commit must fail");
    match err {
        StoreError::RevisionMismatch { expected, actual } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected RevisionMismatch, got {other:?}"),
    }
    assert_eq!(store.ledger(motion_id).count().expect("count"), 2);
    assert_eq!(second.title(), "from second", "staged edits survive a failed commit");
}

#[test]
fn state_changes_persist_on_commit() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    let motion_id = motion.id().expect("saved");

    motion.set_state(&registry, "per").expect("pub -> per");
    let outcome = store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("commit state");
    assert_eq!(outcome.action, CommitAction::Skipped);

    let reloaded = store.load_motion(motion_id).expect("reload");
    let state = reloaded.state(&registry).expect("resolvable state");
    assert_eq!(state.id().as_str(), "per");
    assert!(registry.contains(state.id()));
    assert_eq!(reloaded.title(), "A");
}

#[test]
fn duplicate_identifier_is_rejected() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut first = Motion::new();
    first.set_identifier(Some("M1".to_string()));
    store
        .commit_motion(&mut first, &registry, VersioningPolicy::AlwaysNew)
        .expect("first");

    let mut second = Motion::new();
    second.set_identifier(Some("M1".to_string()));
    match store.commit_motion(&mut second, &registry, VersioningPolicy::AlwaysNew) {
        Err(StoreError::IdentifierTaken(identifier)) => assert_eq!(identifier, "M1"),
        other => panic!("expected IdentifierTaken, got {other:?}"),
    }
    assert!(second.id().is_none());

    let found = store
        .find_motion_by_identifier("M1")
        .expect("lookup")
        .expect("found");
    assert_eq!(found.id(), first.id());
}

#[test]
fn permitted_version_must_belong_to_the_motion() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut own = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    let other = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);

    own.set_permitted_version(other.last_version().map(|v| v.id));
    match store.commit_motion(&mut own, &registry, VersioningPolicy::AlwaysNew) {
        Err(StoreError::Motion(MotionError::Validation(_))) => {}
        other => panic!("expected validation error, got {other:?}"),
    }

    own.set_permitted_version(own.last_version().map(|v| v.id));
    store
        .commit_motion(&mut own, &registry, VersioningPolicy::AlwaysNew)
        .expect("own version is fine");
    let reloaded = store.load_motion(own.id().expect("saved")).expect("reload");
    assert_eq!(reloaded.permitted_version(), own.last_version().map(|v| v.id));
}

#[test]
fn master_reference_is_checked() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);

    motion.set_master(motion.id());
    assert!(store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .is_err());

    motion.set_master(Some(MotionId::new(9999)));
    match store.commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew) {
        Err(StoreError::UnknownId) => {}
        other => panic!("expected UnknownId, got {other:?}"),
    }

    let master = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    let mut copy = Motion::new();
    copy.set_master(master.id());
    store
        .commit_motion(&mut copy, &registry, VersioningPolicy::AlwaysNew)
        .expect("copy of master");
    assert_eq!(copy.master(), master.id());
}

#[test]
fn selected_version_drives_getters() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let mut motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
    motion.set_title("A2");
    store
        .commit_motion(&mut motion, &registry, VersioningPolicy::AlwaysNew)
        .expect("second");

    store
        .select_version_by_ordinal(&mut motion, 1)
        .expect("select v1");
    assert_eq!(motion.title(), "A");
    assert!(store.select_version_by_ordinal(&mut motion, 3).is_err());
    assert_eq!(motion.title(), "A");

    motion.clear_version_selection();
    assert_eq!(motion.title(), "A2");
}

#[test]
fn load_unknown_motion_fails() {
    let (_dir, store) = open_store();
    match store.load_motion(MotionId::new(42)) {
        Err(StoreError::UnknownId) => {}
        other => panic!("expected UnknownId, got {other:?}"),
    }
}

#[test]
fn list_motions_reports_titles_and_filters_by_category() {
    let (_dir, mut store) = open_store();
    let registry = WorkflowRegistry::builtin();
    let category = store
        .create_category(CreateCategoryRequest {
            name: "Budget".to_string(),
            prefix: "B".to_string(),
        })
        .expect("category");

    let mut tagged = Motion::new();
    tagged.set_title("Tagged");
    tagged.set_category(Some(category.id));
    store
        .commit_motion(&mut tagged, &registry, VersioningPolicy::AlwaysNew)
        .expect("tagged");
    scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);

    let all = store
        .list_motions(ListMotionsRequest {
            category: None,
            limit: 10,
            offset: 0,
        })
        .expect("list");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].title.as_deref(), Some("Tagged"));
    assert_eq!(all[0].version_count, 1);

    let filtered = store
        .list_motions(ListMotionsRequest {
            category: Some(category.id),
            limit: 10,
            offset: 0,
        })
        .expect("list filtered");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].category, Some(category.id));

    let mut orphan = Motion::new();
    orphan.set_category(Some(CategoryId::new(777)));
    assert!(store
        .commit_motion(&mut orphan, &registry, VersioningPolicy::AlwaysNew)
        .is_err());
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let registry = WorkflowRegistry::builtin();
    let motion_id = {
        let mut store = SqliteStore::open(dir.path()).expect("open store");
        let motion = scenario_a(&mut store, &registry, VersioningPolicy::AlwaysNew);
        motion.id().expect("saved")
    };

    let store = SqliteStore::open(dir.path()).expect("reopen store");
    let motion = store.load_motion(motion_id).expect("load");
    assert_eq!(motion.title(), "A");
    assert_eq!(motion.reason(), Some("C"));
    assert_eq!(motion.revision(), 1);
}

#[test]
fn foreign_database_requires_reset() {
    let dir = tempfile::tempdir().expect("create temp dir");
    {
        let conn = rusqlite::Connection::open(dir.path().join("motions.db")).expect("open raw db");
        conn.execute_batch("CREATE TABLE tasks (id INTEGER PRIMARY KEY);")
            .expect("create foreign table");
    }
    match SqliteStore::open(dir.path()) {
        Err(StoreError::ResetRequired(_)) => {}
        other => panic!("expected ResetRequired, got {other:?}"),
    }
}
