//! Read access: pure functions of a cache snapshot.
//!
//! Selectors never trigger fetches. Resolving a list silently skips IDs
//! whose entity is no longer stored, which defends against partial or racy
//! deletes.

use super::domain::EntityType;
use super::entity::Entity;
use super::identity::{EntityId, Handle, ListKey};
use super::list::ListState;
use super::store::CacheState;

pub fn select_entity<'a>(
    state: &'a CacheState,
    typ: EntityType,
    id: &EntityId,
) -> Option<&'a Entity> {
    state.store(typ).get(id)
}

/// Resolve a list's ID sequence against the store.
pub fn select_entities<'a>(
    state: &'a CacheState,
    typ: EntityType,
    list: &ListKey,
) -> Vec<&'a Entity> {
    let store = state.store(typ);
    match store.list(list) {
        Some(entry) => entry.ids.iter().filter_map(|id| store.get(id)).collect(),
        None => Vec::new(),
    }
}

pub fn select_list_state<'a>(
    state: &'a CacheState,
    typ: EntityType,
    list: &ListKey,
) -> Option<&'a ListState> {
    state.store(typ).list(list).map(|entry| &entry.state)
}

/// Linear scan for secondary-index-style lookups, e.g. "which loaded
/// notification references status X".
pub fn find_entity<'a>(
    state: &'a CacheState,
    typ: EntityType,
    predicate: impl Fn(&Entity) -> bool,
) -> Option<&'a Entity> {
    state.store(typ).entities().find(|e| predicate(e))
}

pub fn select_account_by_handle<'a>(state: &'a CacheState, handle: &Handle) -> Option<&'a Entity> {
    let id = state.account_id_for(handle)?;
    state.store(EntityType::Account).get(id)
}
