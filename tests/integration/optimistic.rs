//! Optimistic mutation flows end to end: patch, remote call, reconcile.

use fedicache::core::{placeholder_import, select_entities, select_entity};
use fedicache::{
    CacheState, Entity, EntityId, EntityType, InsertPosition, MutateAction, MutationDescriptor,
    Reconcile, mutate,
};
use fedicache::client::SilentCallbacks;
use fedicache::core::entity::{Relationship, Status};
use serde_json::json;

use crate::fixtures::remote::ScriptedRemote;
use crate::fixtures::wire::{id, key, status_json};

#[test]
fn compose_shows_instantly_then_becomes_authoritative() {
    let mut state = CacheState::new();
    let remote = ScriptedRemote::new();
    remote.push_mutation(Some((
        EntityType::Status,
        status_json("900", "me", "myself"),
    )));

    let pending = EntityId::pending();
    let placeholder = Entity::Status(Status {
        id: pending.clone(),
        content: "hello fediverse".into(),
        ..Status::default()
    });
    let op = placeholder_import(
        EntityType::Status,
        placeholder,
        Some(key("home")),
        InsertPosition::Start,
    );

    let outcome = mutate(
        &mut state,
        &remote,
        MutationDescriptor {
            action: MutateAction::CreateStatus {
                content: "hello fediverse".into(),
            },
            patch: |state: &mut CacheState| state.apply(op),
            reconcile: Reconcile::ReplacePending {
                typ: EntityType::Status,
                pending_id: pending.clone(),
                list: Some(key("home")),
            },
        },
        &mut SilentCallbacks,
    );

    assert!(outcome.is_success());
    // The placeholder is fully gone, the server's entity (and its author)
    // landed, and the timeline holds exactly one post.
    assert!(!state.store(EntityType::Status).contains(&pending));
    assert!(state.store(EntityType::Status).contains(&id("900")));
    assert!(state.store(EntityType::Account).contains(&id("me")));
    let home = select_entities(&state, EntityType::Status, &key("home"));
    assert_eq!(home.len(), 1);
    assert_eq!(home[0].id(), &id("900"));
}

#[test]
fn rejected_follow_rolls_back_verbatim() {
    let mut state = CacheState::new();
    state.apply(fedicache::CacheOp::Import {
        typ: EntityType::Relationship,
        entities: vec![Entity::Relationship(Relationship {
            id: id("42"),
            ..Relationship::default()
        })],
        list: None,
        position: InsertPosition::End,
    });
    let before = state.clone();

    let remote = ScriptedRemote::new();
    remote.push_mutation_error(403);

    let outcome = mutate(
        &mut state,
        &remote,
        MutationDescriptor {
            action: MutateAction::Follow {
                account_id: id("42"),
            },
            patch: |state: &mut CacheState| {
                if let Some(Entity::Relationship(rel)) =
                    state.store_mut(EntityType::Relationship).get_mut(&id("42"))
                {
                    rel.requested = true;
                }
                fedicache::ApplyOutcome::default()
            },
            reconcile: Reconcile::KeepOptimistic,
        },
        &mut SilentCallbacks,
    );

    assert!(!outcome.is_success());
    assert_eq!(state, before);
}

#[test]
fn accepted_counter_stays_optimistic_without_server_echo() {
    let mut state = CacheState::new();
    let raw = fedicache::core::decode_status(&json!({
        "id": "1",
        "favourites_count": 3,
    }))
    .unwrap();
    state.apply_batch(
        fedicache::core::normalize(&fedicache::core::RawEntity::Status(Box::new(raw)))
            .into_ops(Some((EntityType::Status, key("home"), InsertPosition::End))),
    );

    let remote = ScriptedRemote::new();
    remote.push_mutation(None);

    let outcome = mutate(
        &mut state,
        &remote,
        MutationDescriptor {
            action: MutateAction::Favourite { status_id: id("1") },
            patch: |state: &mut CacheState| {
                if let Some(Entity::Status(s)) =
                    state.store_mut(EntityType::Status).get_mut(&id("1"))
                {
                    s.favourited = true;
                    s.favourites_count += 1;
                }
                fedicache::ApplyOutcome::default()
            },
            reconcile: Reconcile::KeepOptimistic,
        },
        &mut SilentCallbacks,
    );

    assert!(outcome.is_success());
    let stored = select_entity(&state, EntityType::Status, &id("1"))
        .and_then(Entity::as_status)
        .unwrap();
    assert!(stored.favourited);
    assert_eq!(stored.favourites_count, 4);
    assert_eq!(remote.seen_actions.borrow().len(), 1);
}
