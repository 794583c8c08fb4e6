//! The entity store and its verb set.
//!
//! One `EntityStore` partition exists per entity type inside `CacheState`,
//! the per-session cache context. The store is mutated only through
//! `CacheOp` application; every verb is total and synchronous.
//!
//! INVARIANT: import is idempotent by ID - re-importing identical content
//! changes nothing, re-importing changed content updates in place and never
//! duplicates an ID in any list.
//!
//! INVARIANT: a failed fetch records its error and touches neither entities
//! nor list membership (stale data stays visible).

use std::collections::{BTreeMap, BTreeSet};

use super::domain::{EntityType, InsertPosition};
use super::entity::Entity;
use super::identity::{EntityId, Handle, ListKey};
use super::list::{EntityList, ListState};
use super::query::QueryCache;

/// Type-partitioned key/value store plus named lists over one type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
    lists: BTreeMap<ListKey, EntityList>,
}

impl EntityStore {
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn list(&self, key: &ListKey) -> Option<&EntityList> {
        self.lists.get(key)
    }

    pub fn list_mut(&mut self, key: &ListKey) -> &mut EntityList {
        self.lists.entry(key.clone()).or_default()
    }

    pub fn lists(&self) -> impl Iterator<Item = (&ListKey, &EntityList)> {
        self.lists.iter()
    }

    fn insert(&mut self, entity: Entity) -> bool {
        let id = entity.id().clone();
        match self.entities.get(&id) {
            Some(existing) if *existing == entity => false,
            _ => {
                self.entities.insert(id, entity);
                true
            }
        }
    }

    fn remove(&mut self, id: &EntityId) -> bool {
        self.entities.remove(id).is_some()
    }
}

/// Which cache locations an op application touched; drives change
/// notification to the view layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub changed_entities: BTreeSet<(EntityType, EntityId)>,
    pub changed_lists: BTreeSet<(EntityType, ListKey)>,
}

impl ApplyOutcome {
    pub fn is_empty(&self) -> bool {
        self.changed_entities.is_empty() && self.changed_lists.is_empty()
    }

    pub fn merge(&mut self, other: ApplyOutcome) {
        self.changed_entities.extend(other.changed_entities);
        self.changed_lists.extend(other.changed_lists);
    }
}

/// The verb set. The only way the store is mutated.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheOp {
    /// Merge entities into their partitions; optionally insert their IDs
    /// into one list of `typ` at `position` (existing order preserved).
    Import {
        typ: EntityType,
        entities: Vec<Entity>,
        list: Option<ListKey>,
        position: InsertPosition,
    },
    /// Remove entities; unless `preserve_lists`, also drop the IDs from
    /// every list of the type.
    Delete {
        typ: EntityType,
        ids: Vec<EntityId>,
        preserve_lists: bool,
    },
    /// Remove IDs from exactly one list; entities untouched.
    Dismiss {
        typ: EntityType,
        list: ListKey,
        ids: Vec<EntityId>,
    },
    /// Adjust a list's `total_count` by `diff` (floored at zero).
    Increment {
        typ: EntityType,
        list: ListKey,
        diff: i64,
    },
    /// Force the next read of the list to refetch regardless of staleness.
    InvalidateList { typ: EntityType, list: ListKey },
    /// Mark a fetch in flight.
    FetchRequest { typ: EntityType, list: ListKey },
    /// Land a fetch: import entities, insert into the list, absorb state.
    FetchSuccess {
        typ: EntityType,
        list: ListKey,
        entities: Vec<Entity>,
        position: InsertPosition,
        state: ListState,
        overwrite: bool,
    },
    /// Record an upstream failure. Never evicts cached data.
    FetchFail {
        typ: EntityType,
        list: ListKey,
        error: String,
    },
}

/// The per-session cache context: every store partition, the handle index,
/// and the paginated query cache. Constructed once per session, `reset()`
/// on logout. Cloneable so the optimistic path can snapshot it whole.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheState {
    stores: BTreeMap<EntityType, EntityStore>,
    handle_index: BTreeMap<Handle, EntityId>,
    queries: QueryCache,
}

impl CacheState {
    pub fn new() -> Self {
        let stores = EntityType::ALL
            .iter()
            .map(|typ| (*typ, EntityStore::default()))
            .collect();
        Self {
            stores,
            handle_index: BTreeMap::new(),
            queries: QueryCache::new(),
        }
    }

    /// Tear down all cached state (logout / session reset).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn store(&self, typ: EntityType) -> &EntityStore {
        self.stores
            .get(&typ)
            .expect("every partition exists by construction")
    }

    pub fn store_mut(&mut self, typ: EntityType) -> &mut EntityStore {
        self.stores
            .get_mut(&typ)
            .expect("every partition exists by construction")
    }

    pub fn queries(&self) -> &QueryCache {
        &self.queries
    }

    pub fn queries_mut(&mut self) -> &mut QueryCache {
        &mut self.queries
    }

    pub fn account_id_for(&self, handle: &Handle) -> Option<&EntityId> {
        self.handle_index.get(handle)
    }

    /// Apply one verb. Total: no verb can fail.
    pub fn apply(&mut self, op: CacheOp) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        match op {
            CacheOp::Import {
                typ,
                entities,
                list,
                position,
            } => self.apply_import(typ, entities, list, position, &mut outcome),
            CacheOp::Delete {
                typ,
                ids,
                preserve_lists,
            } => self.apply_delete(typ, &ids, preserve_lists, &mut outcome),
            CacheOp::Dismiss { typ, list, ids } => {
                let entry = self.store_mut(typ).list_mut(&list);
                let mut changed = false;
                for id in &ids {
                    changed |= entry.ids.remove(id);
                }
                if changed {
                    outcome.changed_lists.insert((typ, list));
                }
            }
            CacheOp::Increment { typ, list, diff } => {
                let entry = self.store_mut(typ).list_mut(&list);
                let current = entry.state.total_count.unwrap_or(0) as i64;
                entry.state.total_count = Some(current.saturating_add(diff).max(0) as u64);
                outcome.changed_lists.insert((typ, list));
            }
            CacheOp::InvalidateList { typ, list } => {
                let entry = self.store_mut(typ).list_mut(&list);
                entry.state.invalid = true;
                outcome.changed_lists.insert((typ, list));
            }
            CacheOp::FetchRequest { typ, list } => {
                let entry = self.store_mut(typ).list_mut(&list);
                entry.state.fetching = true;
                entry.state.error = None;
                outcome.changed_lists.insert((typ, list));
            }
            CacheOp::FetchSuccess {
                typ,
                list,
                entities,
                position,
                state,
                overwrite,
            } => {
                self.apply_import(typ, entities, Some(list.clone()), position, &mut outcome);
                let entry = self.store_mut(typ).list_mut(&list);
                entry.state.absorb(state, overwrite);
                outcome.changed_lists.insert((typ, list));
            }
            CacheOp::FetchFail { typ, list, error } => {
                tracing::debug!(typ = typ.as_str(), list = %list, error, "fetch failed");
                let entry = self.store_mut(typ).list_mut(&list);
                entry.state.fetching = false;
                entry.state.error = Some(error);
                outcome.changed_lists.insert((typ, list));
            }
        }
        outcome
    }

    /// Apply a batch atomically with respect to reads: single-threaded
    /// execution means no read can observe a partially applied batch.
    pub fn apply_batch(&mut self, ops: Vec<CacheOp>) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        for op in ops {
            outcome.merge(self.apply(op));
        }
        outcome
    }

    fn apply_import(
        &mut self,
        typ: EntityType,
        entities: Vec<Entity>,
        list: Option<ListKey>,
        position: InsertPosition,
        outcome: &mut ApplyOutcome,
    ) {
        let mut member_ids = Vec::new();
        for entity in entities {
            // Each entity goes to its own partition; the list only accepts
            // IDs of the list's type.
            let own_type = entity.entity_type();
            let id = entity.id().clone();
            if let Entity::Account(account) = &entity {
                self.handle_index
                    .insert(account.handle.clone(), account.id.clone());
            }
            if self.store_mut(own_type).insert(entity) {
                outcome.changed_entities.insert((own_type, id.clone()));
            }
            if own_type == typ && list.is_some() {
                member_ids.push(id);
            }
        }
        let Some(list) = list else { return };
        if member_ids.is_empty() {
            return;
        }
        // A Start batch keeps its internal order: insert back-to-front so
        // the first entity ends up frontmost.
        if position == InsertPosition::Start {
            member_ids.reverse();
        }
        let entry = self.store_mut(typ).list_mut(&list);
        let mut changed = false;
        for id in member_ids {
            changed |= entry.ids.insert(id, position);
        }
        if changed {
            outcome.changed_lists.insert((typ, list));
        }
    }

    fn apply_delete(
        &mut self,
        typ: EntityType,
        ids: &[EntityId],
        preserve_lists: bool,
        outcome: &mut ApplyOutcome,
    ) {
        for id in ids {
            if self.store_mut(typ).remove(id) {
                outcome.changed_entities.insert((typ, id.clone()));
            }
        }
        if typ == EntityType::Account {
            self.handle_index.retain(|_, owner| !ids.contains(owner));
        }
        if preserve_lists {
            return;
        }
        let store = self.store_mut(typ);
        let keys: Vec<ListKey> = store.lists.keys().cloned().collect();
        for key in keys {
            let entry = store.list_mut(&key);
            let mut changed = false;
            for id in ids {
                changed |= entry.ids.remove(id);
            }
            if changed {
                outcome.changed_lists.insert((typ, key));
            }
        }
    }
}

impl Default for CacheState {
    fn default() -> Self {
        Self::new()
    }
}
