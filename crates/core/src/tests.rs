use super::*;
use crate::ids::{MotionId, PersonRef, PersonRefError, StateId, StateIdError, VersionId};
use crate::poll::{CountingPolicy, VoteCounts, next_poll_number, tally};
use crate::staged::Staged;

fn version(id: i64, motion: i64, title: &str, text: &str, reason: Option<&str>) -> MotionVersion {
    MotionVersion {
        id: VersionId::new(id),
        motion_id: MotionId::new(motion),
        content: VersionSnapshot {
            title: title.to_string(),
            text: text.to_string(),
            reason: reason.map(str::to_string),
        },
        note: None,
        rejected: false,
        created_at_ms: 0,
    }
}

fn saved_motion(state: &str, last: Option<MotionVersion>) -> Motion {
    Motion::from_record(
        MotionRecord {
            id: Some(MotionId::new(1)),
            revision: 1,
            state_id: Some(StateId::try_new(state).expect("state id")),
            ..MotionRecord::default()
        },
        last,
    )
}

#[test]
fn getters_fall_back_to_last_version() {
    let mut motion = saved_motion("pub", Some(version(1, 1, "A", "B", Some("C"))));
    assert_eq!(motion.title(), "A");
    assert_eq!(motion.text(), "B");
    assert_eq!(motion.reason(), Some("C"));

    motion.set_title("A2");
    motion.set_reason(None);
    assert_eq!(motion.title(), "A2");
    assert_eq!(motion.text(), "B");
    assert_eq!(motion.reason(), None);
    assert!(motion.staged().title.is_set());
    assert!(!motion.staged().text.is_set());
}

#[test]
fn getters_follow_selected_version() {
    let mut motion = saved_motion("pub", Some(version(2, 1, "new", "new text", None)));
    motion
        .select_by_handle(version(1, 1, "old", "old text", None))
        .expect("select");
    assert_eq!(motion.title(), "old");
    motion.clear_version_selection();
    assert_eq!(motion.title(), "new");
}

#[test]
fn select_by_handle_rejects_foreign_versions() {
    let mut motion = saved_motion("pub", None);
    let err = motion
        .select_by_handle(version(9, 2, "other", "x", None))
        .unwrap_err();
    assert_eq!(
        err,
        MotionError::Validation("version belongs to a different motion")
    );

    let mut unsaved = Motion::new();
    assert!(unsaved.select_by_handle(version(1, 1, "a", "b", None)).is_err());
}

#[test]
fn first_commit_appends_even_without_edits() {
    let motion = Motion::new();
    assert_eq!(
        motion.plan_commit(VersioningPolicy::UpdateExisting),
        CommitPlan::Append(VersionSnapshot::default())
    );
}

#[test]
fn new_motion_plan_carries_staged_fields() {
    let mut motion = Motion::new();
    motion.set_title("A");
    motion.set_text("B");
    motion.set_reason(Some("C".to_string()));
    let CommitPlan::Append(snapshot) = motion.plan_commit(VersioningPolicy::AlwaysNew) else {
        panic!("expected append");
    };
    assert_eq!(snapshot.title, "A");
    assert_eq!(snapshot.text, "B");
    assert_eq!(snapshot.reason.as_deref(), Some("C"));
}

#[test]
fn unchanged_motion_skips() {
    let mut motion = saved_motion("pub", Some(version(1, 1, "A", "B", None)));
    assert_eq!(motion.plan_commit(VersioningPolicy::AlwaysNew), CommitPlan::Skip);

    motion.set_title("A");
    assert_eq!(motion.plan_commit(VersioningPolicy::AlwaysNew), CommitPlan::Skip);
}

#[test]
fn dirty_motion_follows_policy() {
    let mut motion = saved_motion("pub", Some(version(4, 1, "A", "B", Some("C"))));
    motion.set_title("A2");

    let expected = VersionSnapshot {
        title: "A2".to_string(),
        text: "B".to_string(),
        reason: Some("C".to_string()),
    };
    assert_eq!(
        motion.plan_commit(VersioningPolicy::AlwaysNew),
        CommitPlan::Append(expected.clone())
    );
    assert_eq!(
        motion.plan_commit(VersioningPolicy::UpdateExisting),
        CommitPlan::Rewrite {
            version_id: VersionId::new(4),
            snapshot: expected,
        }
    );
}

#[test]
fn requested_version_overrides_policy() {
    let mut motion = saved_motion("pub", Some(version(1, 1, "A", "B", None)));
    motion.request_new_version();
    assert_eq!(
        motion.plan_commit(VersioningPolicy::UpdateExisting),
        CommitPlan::Append(VersionSnapshot {
            title: "A".to_string(),
            text: "B".to_string(),
            reason: None,
        })
    );
}

#[test]
fn carry_forward_uses_last_not_selected_version() {
    let mut motion = saved_motion("pub", Some(version(2, 1, "last", "last text", None)));
    motion
        .select_by_handle(version(1, 1, "first", "first text", None))
        .expect("select");
    motion.set_title("edited");
    let CommitPlan::Append(snapshot) = motion.plan_commit(VersioningPolicy::AlwaysNew) else {
        panic!("expected append");
    };
    assert_eq!(snapshot.text, "last text");
}

#[test]
fn mark_version_written_consumes_staged_edits() {
    let mut motion = saved_motion("pub", Some(version(1, 1, "A", "B", None)));
    motion.set_title("A2");
    motion.request_new_version();
    motion.mark_version_written(version(2, 1, "A2", "B", None));
    assert!(motion.staged().is_empty());
    assert!(!motion.new_version_requested());
    assert_eq!(motion.last_version().map(|v| v.id), Some(VersionId::new(2)));
    assert_eq!(motion.plan_commit(VersioningPolicy::AlwaysNew), CommitPlan::Skip);
}

#[test]
fn set_state_follows_edges_only() {
    let registry = WorkflowRegistry::builtin();
    let mut motion = saved_motion("pub", None);

    let err = motion.set_state(&registry, "acc").unwrap_err();
    assert!(matches!(err, MotionError::WorkflowTransition { .. }));
    assert_eq!(motion.state_id().map(StateId::as_str), Some("pub"));

    motion.set_state(&registry, "per").expect("pub -> per");
    assert_eq!(motion.state(&registry).map(|s| s.name()), Some("permitted"));
    motion.set_state(&registry, "acc").expect("per -> acc");

    let err = motion.set_state(&registry, "per").unwrap_err();
    assert_eq!(
        err,
        MotionError::WorkflowTransition {
            from: Some(StateId::try_new("acc").expect("acc")),
            to: StateId::try_new("per").expect("per"),
        }
    );
}

#[test]
fn set_state_rejects_unknown_target() {
    let registry = WorkflowRegistry::builtin();
    let mut motion = saved_motion("pub", None);
    assert_eq!(
        motion.set_state(&registry, "xx").unwrap_err(),
        MotionError::UnknownState("xx".to_string())
    );
    assert_eq!(motion.state_id().map(StateId::as_str), Some("pub"));
}

#[test]
fn stale_state_reads_as_none_and_reset_recovers() {
    let registry = WorkflowRegistry::builtin();
    let mut motion = saved_motion("old", None);
    assert!(motion.state(&registry).is_none());
    assert!(motion.set_state(&registry, "per").is_err());
    assert!(motion.ensure_state(&registry).is_err());

    motion.reset_state(&registry);
    assert_eq!(motion.state(&registry).map(|s| s.id().as_str()), Some("pub"));
}

#[test]
fn ensure_state_fills_default() {
    let registry = WorkflowRegistry::builtin();
    let mut motion = Motion::new();
    assert!(motion.state(&registry).is_none());
    let state = motion.ensure_state(&registry).expect("default");
    assert_eq!(state.as_str(), "pub");
    assert_eq!(motion.state_id(), Some(&state));
}

#[test]
fn identifier_is_trimmed_and_blank_is_none() {
    let mut motion = Motion::new();
    motion.set_identifier(Some("  A1 ".to_string()));
    assert_eq!(motion.identifier(), Some("A1"));
    motion.set_identifier(Some("   ".to_string()));
    assert_eq!(motion.identifier(), None);
}

#[test]
fn staged_holder_distinguishes_unset_from_none() {
    let mut reason: Staged<Option<String>> = Staged::default();
    assert!(!reason.is_set());
    reason = Staged::Set(None);
    assert!(reason.is_set());
    reason.clear();
    assert_eq!(reason, Staged::Unset);
}

#[test]
fn id_validation() {
    assert_eq!(PersonRef::try_new(" ").unwrap_err(), PersonRefError::Empty);
    assert_eq!(
        PersonRef::try_new("bad\u{0007}").unwrap_err(),
        PersonRefError::ContainsControl
    );
    assert_eq!(PersonRef::try_new(" alice ").expect("person").as_str(), "alice");
    assert!(PersonRef::try_new("ä".repeat(255)).is_ok());
    assert_eq!(
        PersonRef::try_new("ä".repeat(256)).unwrap_err(),
        PersonRefError::TooLong
    );

    assert_eq!(StateId::try_new("").unwrap_err(), StateIdError::Empty);
    assert_eq!(StateId::try_new("long").unwrap_err(), StateIdError::TooLong);
    assert_eq!(StateId::try_new("default").unwrap_err(), StateIdError::Reserved);
    assert_eq!(StateId::try_new("a b").unwrap_err(), StateIdError::InvalidChar);
}

#[test]
fn versioning_policy_parses_aliases() {
    assert_eq!(
        "ALWAYS_CREATE_NEW_VERSION".parse::<VersioningPolicy>(),
        Ok(VersioningPolicy::AlwaysNew)
    );
    assert_eq!(
        "update_existing".parse::<VersioningPolicy>(),
        Ok(VersioningPolicy::UpdateExisting)
    );
    assert!("sometimes".parse::<VersioningPolicy>().is_err());

    let parsed: VersioningPolicy =
        serde_yaml::from_str("NEVER_CREATE_NEW_VERSION").expect("yaml policy");
    assert_eq!(parsed, VersioningPolicy::UpdateExisting);
}

#[test]
fn poll_numbers_never_go_backwards() {
    assert_eq!(next_poll_number(None, 0), 1);
    assert_eq!(next_poll_number(Some(2), 2), 3);
    assert_eq!(next_poll_number(Some(1), 3), 4);
    assert_eq!(next_poll_number(Some(5), 0), 6);
}

#[test]
fn tally_respects_counting_policy() {
    let counts = VoteCounts {
        yes: 6,
        no: 2,
        abstain: 1,
        votes_cast: Some(10),
        votes_invalid: Some(1),
    };
    let full = tally(&counts, &CountingPolicy::default());
    assert_eq!(full.cast, Some(10));
    assert_eq!(full.invalid, Some(1));
    assert_eq!(full.yes_share(), Some(0.75));

    let bare = tally(
        &counts,
        &CountingPolicy {
            count_invalid: false,
            count_cast: false,
        },
    );
    assert_eq!(bare.cast, None);
    assert_eq!(bare.invalid, None);

    let derived = tally(
        &VoteCounts {
            yes: 1,
            no: 1,
            abstain: 1,
            ..VoteCounts::default()
        },
        &CountingPolicy::default(),
    );
    assert_eq!(derived.cast, Some(3));
    assert_eq!(derived.invalid, Some(0));
}

#[test]
fn tally_without_decisive_votes_has_no_share() {
    let result = tally(&VoteCounts::default(), &CountingPolicy::default());
    assert_eq!(result.yes_share(), None);
    assert!(VoteCounts {
        yes: -1,
        ..VoteCounts::default()
    }
    .validate()
    .is_err());
}

#[test]
fn oversized_vote_counts_are_rejected_and_tally_saturates() {
    let huge = VoteCounts {
        yes: i64::MAX,
        no: 1,
        ..VoteCounts::default()
    };
    assert_eq!(huge.total(), None);
    assert_eq!(huge.validate(), Err("vote counts are too large"));

    let result = tally(&huge, &CountingPolicy::default());
    assert_eq!(result.cast, Some(i64::MAX));
    let share = result.yes_share().expect("decisive votes present");
    assert!(share > 0.99 && share <= 1.0);

    let fits = VoteCounts {
        yes: i64::MAX - 2,
        no: 1,
        abstain: 1,
        ..VoteCounts::default()
    };
    assert_eq!(fits.validate(), Ok(()));
}
