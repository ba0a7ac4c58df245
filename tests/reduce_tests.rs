mod common;

use common::{group_join, group_leave, snap, user_join, user_leave};
use roomwatch::{Event, MembershipSnapshot, apply, reduce};

#[test]
fn test_empty_input_empty_snapshot() {
    let snapshot = reduce([]);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.group_count(), 0);
    assert_eq!(snapshot.user_count(), 0);
}

#[test]
fn test_joins_accumulate_in_order() {
    let snapshot = reduce([group_join("Jam", "alice"), group_join("Jam", "bob")]);
    assert_eq!(
        snapshot.members("Jam"),
        Some(&["alice".to_string(), "bob".to_string()][..])
    );
}

#[test]
fn test_leave_prunes_empty_group() {
    let snapshot = reduce([group_join("Jam", "alice"), group_leave("Jam", "alice")]);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.members("Jam"), None);
}

#[test]
fn test_user_leave_sweeps_all_groups() {
    let snapshot = reduce([
        group_join("A", "alice"),
        group_join("B", "alice"),
        user_leave("alice"),
    ]);
    assert!(snapshot.is_empty());
}

#[test]
fn test_user_leave_keeps_other_members() {
    let snapshot = reduce([
        group_join("A", "alice"),
        group_join("A", "bob"),
        group_join("B", "alice"),
        user_leave("alice"),
    ]);
    assert_eq!(snapshot.members("A"), Some(&["bob".to_string()][..]));
    assert_eq!(snapshot.members("B"), None);
}

#[test]
fn test_duplicate_join_idempotent() {
    let snapshot = reduce([group_join("Jam", "alice"), group_join("Jam", "alice")]);
    assert_eq!(snapshot.members("Jam"), Some(&["alice".to_string()][..]));
}

#[test]
fn test_rejoin_moves_to_end_of_listing() {
    let snapshot = reduce([
        group_join("Jam", "alice"),
        group_join("Jam", "bob"),
        group_leave("Jam", "alice"),
        group_join("Jam", "alice"),
    ]);
    assert_eq!(
        snapshot.members("Jam"),
        Some(&["bob".to_string(), "alice".to_string()][..])
    );
}

#[test]
fn test_leave_for_absent_pair_no_effect() {
    let expected = reduce([group_join("Jam", "alice")]);
    let snapshot = reduce([
        group_join("Jam", "alice"),
        group_leave("Jam", "bob"),
        group_leave("Mix", "alice"),
        user_leave("carol"),
    ]);
    assert_eq!(snapshot, expected);
}

#[test]
fn test_user_join_and_unrecognized_are_no_ops() {
    let expected = reduce([group_join("Jam", "alice")]);
    let snapshot = reduce([
        user_join("alice"),
        Event::Unrecognized,
        group_join("Jam", "alice"),
        Event::Unrecognized,
        user_join("bob"),
    ]);
    assert_eq!(snapshot, expected);
}

#[test]
fn test_reduce_is_deterministic() {
    let events = vec![
        group_join("Jam", "alice"),
        group_join("Mix", "bob"),
        group_join("Jam", "carol"),
        group_leave("Jam", "alice"),
        user_leave("bob"),
    ];
    assert_eq!(reduce(events.clone()), reduce(events));
}

#[test]
fn test_apply_single_step() {
    let snapshot = apply(
        MembershipSnapshot::new(),
        &group_join("Jam", "alice"),
    );
    assert!(snapshot.contains("Jam", "alice"));
    assert_eq!(snapshot, snap(&[("Jam", &["alice"])]));
}

#[test]
fn test_groups_iterate_in_name_order() {
    let snapshot = reduce([
        group_join("Mix", "bob"),
        group_join("Jam", "alice"),
        group_join("Annex", "carol"),
    ]);
    let names: Vec<&str> = snapshot.groups().map(|(g, _)| g).collect();
    assert_eq!(names, vec!["Annex", "Jam", "Mix"]);
}
