//! The cache core.
//!
//! Module hierarchy follows type dependency order:
//! - time: wall-clock primitives
//! - identity: EntityId, ListKey, Handle, Cursor
//! - domain: EntityType and classification enums
//! - entity: stored (normalized) entities + reaction merge
//! - raw: wire shapes with embedded children + total decoders
//! - list: OrderedIdSet, ListState, EntityList
//! - query: paginated query cache
//! - store: EntityStore, CacheState, the CacheOp verb set
//! - normalize: denormalized graph -> per-type buckets
//! - selectors: pure read access
//! - optimistic: snapshot/rollback mutation protocol

pub mod domain;
pub mod entity;
pub mod error;
pub mod identity;
pub mod list;
pub mod normalize;
pub mod optimistic;
pub mod query;
pub mod raw;
pub mod selectors;
pub mod store;
pub mod time;

pub use domain::{EntityType, FollowEvent, InsertPosition, NotificationKind};
pub use entity::{
    Account, Announcement, Chat, ChatMessage, Entity, Group, Marker, Notification, Poll,
    PollOption, Reaction, Reactions, Relationship, Status,
};
pub use error::{CoreError, InvalidId, MalformedPayload};
pub use identity::{Cursor, EntityId, Handle, ListKey};
pub use list::{EntityList, ListState, OrderedIdSet};
pub use normalize::{NormalizedBuckets, normalize, normalize_all, normalize_shallow};
pub use optimistic::{MutationPhase, OptimisticMutation, Reconcile, placeholder_import};
pub use query::{Page, QueryCache, QueryEntry, QueryKey, flatten, id_matcher};
pub use raw::{
    RawAccount, RawAnnouncement, RawChat, RawChatMessage, RawEntity, RawGroup, RawMarker,
    RawNotification, RawPoll, RawRelationship, RawStatus, decode_account, decode_announcement,
    decode_chat, decode_chat_message, decode_entity, decode_group, decode_marker,
    decode_notification, decode_poll, decode_relationship, decode_status,
};
pub use selectors::{
    find_entity, select_account_by_handle, select_entities, select_entity, select_list_state,
};
pub use store::{ApplyOutcome, CacheOp, CacheState, EntityStore};
pub use time::WallClock;
