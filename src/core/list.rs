//! Lists: ordered ID sequences with fetch-lifecycle metadata.
//!
//! List membership and entity existence are independent lifecycles: a list
//! can drop a reference while the entity stays in the store, and an entity
//! can exist with no list referencing it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::InsertPosition;
use super::identity::{Cursor, EntityId};
use super::time::WallClock;

/// Insertion-ordered, duplicate-free ID sequence.
///
/// Inserting an ID already present preserves the existing position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedIdSet {
    order: Vec<EntityId>,
    #[serde(skip, default)]
    present: BTreeSet<EntityId>,
}

impl OrderedIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: EntityId, position: InsertPosition) -> bool {
        if self.present.contains(&id) {
            return false;
        }
        self.present.insert(id.clone());
        match position {
            InsertPosition::Start => self.order.insert(0, id),
            InsertPosition::End => self.order.push(id),
        }
        true
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        if self.present.remove(id) {
            self.order.retain(|x| x != id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.present.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.order.iter()
    }

    /// Rebuild the membership set after deserialization.
    pub fn rehydrate(&mut self) {
        self.present = self.order.iter().cloned().collect();
    }
}

/// Fetch-lifecycle metadata for one list.
///
/// `fetching` is true for at most one in-flight request per list; a failed
/// fetch records `error` and leaves previously cached IDs untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    pub fetching: bool,
    pub fetched: bool,
    pub invalid: bool,
    pub error: Option<String>,
    pub last_fetched_at: Option<WallClock>,
    pub next: Option<Cursor>,
    pub prev: Option<Cursor>,
    pub total_count: Option<u64>,
}

impl ListState {
    /// Merge a completed fetch's state over this one.
    ///
    /// `overwrite` replaces everything; otherwise only the fields the new
    /// fetch actually learned (cursors left as-is when the response carried
    /// none).
    pub fn absorb(&mut self, fresh: ListState, overwrite: bool) {
        if overwrite {
            *self = fresh;
            return;
        }
        self.fetching = fresh.fetching;
        self.fetched = fresh.fetched;
        self.invalid = fresh.invalid;
        self.error = fresh.error;
        self.last_fetched_at = fresh.last_fetched_at;
        if fresh.next.is_some() {
            self.next = fresh.next;
        }
        if fresh.prev.is_some() {
            self.prev = fresh.prev;
        }
        if fresh.total_count.is_some() {
            self.total_count = fresh.total_count;
        }
    }
}

/// A named list: ordered IDs plus lifecycle state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityList {
    pub ids: OrderedIdSet,
    pub state: ListState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::parse(s).unwrap()
    }

    #[test]
    fn insert_preserves_existing_position() {
        let mut set = OrderedIdSet::new();
        set.insert(id("a"), InsertPosition::End);
        set.insert(id("b"), InsertPosition::End);
        assert!(!set.insert(id("a"), InsertPosition::Start));
        let order: Vec<_> = set.iter().map(EntityId::as_str).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn insert_at_start() {
        let mut set = OrderedIdSet::new();
        set.insert(id("a"), InsertPosition::End);
        set.insert(id("b"), InsertPosition::Start);
        let order: Vec<_> = set.iter().map(EntityId::as_str).collect();
        assert_eq!(order, ["b", "a"]);
    }

    #[test]
    fn remove_then_reinsert() {
        let mut set = OrderedIdSet::new();
        set.insert(id("a"), InsertPosition::End);
        assert!(set.remove(&id("a")));
        assert!(!set.remove(&id("a")));
        assert!(set.insert(id("a"), InsertPosition::End));
    }

    #[test]
    fn absorb_without_overwrite_keeps_old_cursors() {
        let mut state = ListState {
            next: Some(Cursor::new("n1")),
            total_count: Some(5),
            ..ListState::default()
        };
        state.absorb(
            ListState {
                fetched: true,
                ..ListState::default()
            },
            false,
        );
        assert!(state.fetched);
        assert_eq!(state.next, Some(Cursor::new("n1")));
        assert_eq!(state.total_count, Some(5));
    }
}
