//! Normalization + store semantics through the public API.

use fedicache::core::{
    decode_status, normalize, select_account_by_handle, select_entities, select_entity,
};
use fedicache::{CacheOp, CacheState, Entity, EntityType, InsertPosition, RawEntity};

use crate::fixtures::wire::{handle, id, key, reblog_json};

#[test]
fn one_response_updates_every_affected_store() {
    let mut state = CacheState::new();
    let raw = RawEntity::Status(Box::new(
        decode_status(&reblog_json("7", "1", "9")).unwrap(),
    ));

    let outcome = state.apply_batch(normalize(&raw).into_ops(Some((
        EntityType::Status,
        key("home"),
        InsertPosition::End,
    ))));

    // Outer status, reblogged status, and both authors, one batch.
    assert!(state.store(EntityType::Status).contains(&id("7")));
    assert!(state.store(EntityType::Status).contains(&id("1")));
    assert!(state.store(EntityType::Account).contains(&id("9")));
    assert!(state.store(EntityType::Account).contains(&id("42")));
    assert_eq!(outcome.changed_entities.len(), 4);

    // Only the top-level status joined the timeline.
    let home = select_entities(&state, EntityType::Status, &key("home"));
    assert_eq!(home.len(), 1);
    assert_eq!(home[0].id(), &id("7"));

    // The stored status references its children by ID only.
    let stored = select_entity(&state, EntityType::Status, &id("7"))
        .and_then(Entity::as_status)
        .unwrap();
    assert_eq!(stored.reblog_id, Some(id("1")));
    assert_eq!(stored.account_id, Some(id("9")));
}

#[test]
fn handle_index_resolves_case_insensitively() {
    let mut state = CacheState::new();
    let raw = RawEntity::Status(Box::new(
        decode_status(&reblog_json("7", "1", "9")).unwrap(),
    ));
    state.apply_batch(normalize(&raw).into_ops(None));

    let found = select_account_by_handle(&state, &handle("ALICE")).unwrap();
    assert_eq!(found.id(), &id("42"));
}

#[test]
fn dismiss_then_delete_compose() {
    let mut state = CacheState::new();
    let raw = RawEntity::Status(Box::new(
        decode_status(&reblog_json("7", "1", "9")).unwrap(),
    ));
    state.apply_batch(normalize(&raw).into_ops(Some((
        EntityType::Status,
        key("home"),
        InsertPosition::End,
    ))));

    // Dismiss hides from the list but keeps the entity readable.
    state.apply(CacheOp::Dismiss {
        typ: EntityType::Status,
        list: key("home"),
        ids: vec![id("7")],
    });
    assert!(select_entities(&state, EntityType::Status, &key("home")).is_empty());
    assert!(select_entity(&state, EntityType::Status, &id("7")).is_some());

    // Delete drops the entity; the reblogged child is untouched.
    state.apply(CacheOp::Delete {
        typ: EntityType::Status,
        ids: vec![id("7")],
        preserve_lists: false,
    });
    assert!(select_entity(&state, EntityType::Status, &id("7")).is_none());
    assert!(select_entity(&state, EntityType::Status, &id("1")).is_some());
}

#[test]
fn reset_returns_to_pristine_state() {
    let mut state = CacheState::new();
    let raw = RawEntity::Status(Box::new(
        decode_status(&reblog_json("7", "1", "9")).unwrap(),
    ));
    state.apply_batch(normalize(&raw).into_ops(None));
    assert!(!state.store(EntityType::Status).is_empty());

    state.reset();
    assert_eq!(state, CacheState::new());
    assert!(select_account_by_handle(&state, &handle("alice")).is_none());
}
