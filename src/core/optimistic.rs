//! Optimistic mutation protocol.
//!
//! Per mutation: idle -> pending (forward patch applied, prior state
//! snapshotted) -> settled-success | settled-error. Rollback restores the
//! snapshot verbatim rather than computing an inverse, so a failed
//! mutation can never compound an imprecise undo.
//!
//! Patches compose: a second mutation begun while one is pending computes
//! its patch against the already-optimistic state, and its rollback
//! restores only its own snapshot. If A fails after B settled on top of
//! it, A's rollback resurrects a state that predates B - a known sharp
//! edge inherited from the protocol, kept rather than silently redefined.

use super::domain::{EntityType, InsertPosition};
use super::entity::Entity;
use super::identity::{EntityId, ListKey};
use super::normalize::normalize;
use super::raw::RawEntity;
use super::store::{ApplyOutcome, CacheOp, CacheState};

/// Lifecycle of one mutation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationPhase {
    Pending,
    SettledSuccess,
    SettledError,
}

/// How a successful response reconciles with the speculative patch.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconcile {
    /// Replace the optimistic placeholder (matched by its synthetic
    /// pending ID) wholesale with the authoritative entity.
    ReplacePending {
        typ: EntityType,
        pending_id: EntityId,
        list: Option<ListKey>,
    },
    /// Counter-style mutation: the optimistic value already matches server
    /// truth to within eventual consistency; keep it.
    KeepOptimistic,
}

/// A begun mutation holding its rollback snapshot.
///
/// The snapshot is the whole cache context. Exactness beats economy here:
/// restoring it is structurally identical to the pre-patch state.
#[derive(Debug)]
pub struct OptimisticMutation {
    snapshot: Box<CacheState>,
    reconcile: Reconcile,
    phase: MutationPhase,
}

impl OptimisticMutation {
    /// Snapshot `state`, apply the forward patch, go pending.
    pub fn begin(
        state: &mut CacheState,
        reconcile: Reconcile,
        patch: impl FnOnce(&mut CacheState) -> ApplyOutcome,
    ) -> (Self, ApplyOutcome) {
        let snapshot = Box::new(state.clone());
        let outcome = patch(state);
        (
            Self {
                snapshot,
                reconcile,
                phase: MutationPhase::Pending,
            },
            outcome,
        )
    }

    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Reconcile the server's authoritative response.
    pub fn settle_success(
        mut self,
        state: &mut CacheState,
        response: Option<&RawEntity>,
    ) -> ApplyOutcome {
        self.phase = MutationPhase::SettledSuccess;
        match (&self.reconcile, response) {
            (
                Reconcile::ReplacePending {
                    typ,
                    pending_id,
                    list,
                },
                Some(raw),
            ) => {
                let typ = *typ;
                let mut outcome = state.apply(CacheOp::Delete {
                    typ,
                    ids: vec![pending_id.clone()],
                    preserve_lists: false,
                });
                let ops = normalize(raw).into_ops(
                    list.clone().map(|key| (typ, key, InsertPosition::End)),
                );
                outcome.merge(state.apply_batch(ops));
                outcome
            }
            // Counter-style: leave the optimistic value in place.
            _ => ApplyOutcome::default(),
        }
    }

    /// Restore the exact pre-mutation snapshot.
    pub fn settle_failure(mut self, state: &mut CacheState) {
        self.phase = MutationPhase::SettledError;
        *state = *self.snapshot;
    }
}

/// Build the placeholder entity + patch op for a `ReplacePending` mutation.
pub fn placeholder_import(
    typ: EntityType,
    placeholder: Entity,
    list: Option<ListKey>,
    position: InsertPosition,
) -> CacheOp {
    CacheOp::Import {
        typ,
        entities: vec![placeholder],
        list,
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{Reaction, Status};
    use crate::core::raw::decode_status;
    use serde_json::json;

    fn id(s: &str) -> EntityId {
        EntityId::parse(s).unwrap()
    }

    fn key(s: &str) -> ListKey {
        ListKey::parse(s).unwrap()
    }

    fn seed(state: &mut CacheState) {
        state.apply(CacheOp::Import {
            typ: EntityType::Status,
            entities: vec![Entity::Status(Status {
                id: id("1"),
                reactions: crate::core::entity::Reactions::new(vec![Reaction {
                    name: "👍".into(),
                    count: 2,
                    me: false,
                }]),
                ..Status::default()
            })],
            list: Some(key("home")),
            position: InsertPosition::End,
        });
    }

    fn bump_reaction(state: &mut CacheState) -> ApplyOutcome {
        if let Some(Entity::Status(s)) = state.store_mut(EntityType::Status).get_mut(&id("1")) {
            s.reactions.merge("👍", 3, true, true);
        }
        ApplyOutcome::default()
    }

    #[test]
    fn rollback_restores_exact_state() {
        let mut state = CacheState::new();
        seed(&mut state);
        let before = state.clone();

        let (mutation, _) =
            OptimisticMutation::begin(&mut state, Reconcile::KeepOptimistic, bump_reaction);
        assert_ne!(state, before);
        assert_eq!(mutation.phase(), MutationPhase::Pending);

        mutation.settle_failure(&mut state);
        assert_eq!(state, before);
    }

    #[test]
    fn success_keeps_optimistic_counter() {
        let mut state = CacheState::new();
        seed(&mut state);

        let (mutation, _) =
            OptimisticMutation::begin(&mut state, Reconcile::KeepOptimistic, bump_reaction);
        mutation.settle_success(&mut state, None);

        let stored = state.store(EntityType::Status).get(&id("1")).unwrap();
        let reaction = stored.as_status().unwrap().reactions.get("👍").unwrap();
        assert_eq!((reaction.count, reaction.me), (3, true));
    }

    #[test]
    fn success_replaces_placeholder_with_authoritative_entity() {
        let mut state = CacheState::new();
        let pending_id = EntityId::pending();
        let placeholder = Entity::Status(Status {
            id: pending_id.clone(),
            content: "draft".into(),
            ..Status::default()
        });

        let op = placeholder_import(
            EntityType::Status,
            placeholder,
            Some(key("home")),
            InsertPosition::Start,
        );
        let (mutation, _) = OptimisticMutation::begin(
            &mut state,
            Reconcile::ReplacePending {
                typ: EntityType::Status,
                pending_id: pending_id.clone(),
                list: Some(key("home")),
            },
            |state| state.apply(op),
        );
        assert!(state.store(EntityType::Status).contains(&pending_id));

        let raw = RawEntity::Status(Box::new(
            decode_status(&json!({ "id": "900", "content": "posted" })).unwrap(),
        ));
        mutation.settle_success(&mut state, Some(&raw));

        assert!(!state.store(EntityType::Status).contains(&pending_id));
        assert!(state.store(EntityType::Status).contains(&id("900")));
        let home = state.store(EntityType::Status).list(&key("home")).unwrap();
        assert!(home.ids.contains(&id("900")));
        assert!(!home.ids.contains(&pending_id));
    }

    // Documents the composition sharp edge: A's rollback resurrects a
    // state that predates B's settled success.
    #[test]
    fn stacked_rollback_predates_later_mutation() {
        let mut state = CacheState::new();
        seed(&mut state);
        let before_a = state.clone();

        let (mutation_a, _) =
            OptimisticMutation::begin(&mut state, Reconcile::KeepOptimistic, bump_reaction);
        let (mutation_b, _) =
            OptimisticMutation::begin(&mut state, Reconcile::KeepOptimistic, |state| {
                if let Some(Entity::Status(s)) =
                    state.store_mut(EntityType::Status).get_mut(&id("1"))
                {
                    s.favourited = true;
                }
                ApplyOutcome::default()
            });

        mutation_b.settle_success(&mut state, None);
        mutation_a.settle_failure(&mut state);

        // B's contribution is gone too: the snapshot predates it.
        assert_eq!(state, before_a);
    }
}
