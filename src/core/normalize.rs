//! Normalizer: flattens denormalized entity graphs.
//!
//! Depth-first walk of the known embedding points (status -> account /
//! reblog / quote / poll / group, notification -> account / target /
//! status, account -> moved / relationship, chat -> account /
//! last_message). Each visited node lands in its type bucket keyed by ID.
//! A second visit to the same ID overwrites the bucket value but does not
//! redescend, so self-quotes and mutually-referencing accounts terminate.
//!
//! Shallow mode converts only the top-level object - used when children
//! are already known-fresh, to avoid needless store churn.

use std::collections::{BTreeMap, BTreeSet};

use super::domain::{EntityType, InsertPosition};
use super::entity::{
    Account, Announcement, Chat, ChatMessage, Entity, Group, Marker, Notification, Poll,
    PollOption, Relationship, Status,
};
use super::identity::{EntityId, ListKey};
use super::raw::{
    RawAccount, RawAnnouncement, RawChat, RawChatMessage, RawEntity, RawGroup, RawMarker,
    RawNotification, RawPoll, RawRelationship, RawStatus,
};
use super::store::CacheOp;

/// Flattened output: one ID-keyed bucket per entity type, plus the
/// top-level roots in input order. List membership attaches to roots
/// only - an embedded same-type child (a reblogged status, say) lands
/// in its bucket but never joins the target list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedBuckets {
    pub roots: Vec<(EntityType, EntityId)>,
    pub accounts: BTreeMap<EntityId, Account>,
    pub statuses: BTreeMap<EntityId, Status>,
    pub notifications: BTreeMap<EntityId, Notification>,
    pub polls: BTreeMap<EntityId, Poll>,
    pub groups: BTreeMap<EntityId, Group>,
    pub relationships: BTreeMap<EntityId, Relationship>,
    pub chats: BTreeMap<EntityId, Chat>,
    pub chat_messages: BTreeMap<EntityId, ChatMessage>,
    pub announcements: BTreeMap<EntityId, Announcement>,
    pub markers: BTreeMap<EntityId, Marker>,
}

impl NormalizedBuckets {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.statuses.is_empty()
            && self.notifications.is_empty()
            && self.polls.is_empty()
            && self.groups.is_empty()
            && self.relationships.is_empty()
            && self.chats.is_empty()
            && self.chat_messages.is_empty()
            && self.announcements.is_empty()
            && self.markers.is_empty()
    }

    pub fn merge(&mut self, other: NormalizedBuckets) {
        self.roots.extend(other.roots);
        self.accounts.extend(other.accounts);
        self.statuses.extend(other.statuses);
        self.notifications.extend(other.notifications);
        self.polls.extend(other.polls);
        self.groups.extend(other.groups);
        self.relationships.extend(other.relationships);
        self.chats.extend(other.chats);
        self.chat_messages.extend(other.chat_messages);
        self.announcements.extend(other.announcements);
        self.markers.extend(other.markers);
    }

    /// Remove and return the top-level roots of one type, in input order.
    /// Embedded same-type children stay behind in the bucket.
    pub fn take_roots(&mut self, typ: EntityType) -> Vec<Entity> {
        let mut ids = Vec::new();
        self.roots.retain(|(root_typ, id)| {
            if *root_typ == typ {
                ids.push(id.clone());
                false
            } else {
                true
            }
        });
        ids.iter().filter_map(|id| self.remove(typ, id)).collect()
    }

    fn remove(&mut self, typ: EntityType, id: &EntityId) -> Option<Entity> {
        match typ {
            EntityType::Account => self.accounts.remove(id).map(Entity::Account),
            EntityType::Status => self.statuses.remove(id).map(Entity::Status),
            EntityType::Notification => self.notifications.remove(id).map(Entity::Notification),
            EntityType::Poll => self.polls.remove(id).map(Entity::Poll),
            EntityType::Group => self.groups.remove(id).map(Entity::Group),
            EntityType::Relationship => self.relationships.remove(id).map(Entity::Relationship),
            EntityType::Chat => self.chats.remove(id).map(Entity::Chat),
            EntityType::ChatMessage => self.chat_messages.remove(id).map(Entity::ChatMessage),
            EntityType::Announcement => self.announcements.remove(id).map(Entity::Announcement),
            EntityType::Marker => self.markers.remove(id).map(Entity::Marker),
        }
    }

    /// Convert to one `Import` per non-empty bucket. The list insertion
    /// attaches only to the top-level roots of `list`'s type, in input
    /// order; everything else imports with no list membership. A single
    /// `apply_batch` of the result is the "one API response updates
    /// several unrelated type stores" transaction.
    pub fn into_ops(mut self, list: Option<(EntityType, ListKey, InsertPosition)>) -> Vec<CacheOp> {
        let mut ops = Vec::new();
        if let Some((typ, key, position)) = list {
            let entities = self.take_roots(typ);
            if !entities.is_empty() {
                ops.push(CacheOp::Import {
                    typ,
                    entities,
                    list: Some(key),
                    position,
                });
            }
        }
        let buckets: [(EntityType, Vec<Entity>); 10] = [
            (
                EntityType::Account,
                self.accounts.into_values().map(Entity::Account).collect(),
            ),
            (
                EntityType::Status,
                self.statuses.into_values().map(Entity::Status).collect(),
            ),
            (
                EntityType::Notification,
                self.notifications
                    .into_values()
                    .map(Entity::Notification)
                    .collect(),
            ),
            (
                EntityType::Poll,
                self.polls.into_values().map(Entity::Poll).collect(),
            ),
            (
                EntityType::Group,
                self.groups.into_values().map(Entity::Group).collect(),
            ),
            (
                EntityType::Relationship,
                self.relationships
                    .into_values()
                    .map(Entity::Relationship)
                    .collect(),
            ),
            (
                EntityType::Chat,
                self.chats.into_values().map(Entity::Chat).collect(),
            ),
            (
                EntityType::ChatMessage,
                self.chat_messages
                    .into_values()
                    .map(Entity::ChatMessage)
                    .collect(),
            ),
            (
                EntityType::Announcement,
                self.announcements
                    .into_values()
                    .map(Entity::Announcement)
                    .collect(),
            ),
            (
                EntityType::Marker,
                self.markers.into_values().map(Entity::Marker).collect(),
            ),
        ];
        for (typ, entities) in buckets {
            if entities.is_empty() {
                continue;
            }
            ops.push(CacheOp::Import {
                typ,
                entities,
                list: None,
                position: InsertPosition::End,
            });
        }
        ops
    }
}

/// Normalize one entity graph.
pub fn normalize(raw: &RawEntity) -> NormalizedBuckets {
    let mut walker = Walker::default();
    walker.visit(raw);
    walker.buckets
}

/// Normalize a batch of graphs into one set of buckets (one list response).
pub fn normalize_all<'a>(raws: impl IntoIterator<Item = &'a RawEntity>) -> NormalizedBuckets {
    let mut walker = Walker::default();
    for raw in raws {
        walker.visit(raw);
    }
    walker.buckets
}

/// Import only the top-level object; children are skipped entirely.
pub fn normalize_shallow(raw: &RawEntity) -> NormalizedBuckets {
    let mut buckets = NormalizedBuckets::default();
    buckets.roots.push((raw.entity_type(), raw.id().clone()));
    match raw {
        RawEntity::Account(a) => {
            buckets.accounts.insert(a.id.clone(), account_record(a));
        }
        RawEntity::Status(s) => {
            buckets.statuses.insert(s.id.clone(), status_record(s));
        }
        RawEntity::Notification(n) => {
            buckets
                .notifications
                .insert(n.id.clone(), notification_record(n));
        }
        RawEntity::Poll(p) => {
            buckets.polls.insert(p.id.clone(), poll_record(p));
        }
        RawEntity::Group(g) => {
            buckets.groups.insert(g.id.clone(), group_record(g));
        }
        RawEntity::Relationship(r) => {
            buckets
                .relationships
                .insert(r.id.clone(), relationship_record(r));
        }
        RawEntity::Chat(c) => {
            buckets.chats.insert(c.id.clone(), chat_record(c));
        }
        RawEntity::ChatMessage(m) => {
            buckets
                .chat_messages
                .insert(m.id.clone(), chat_message_record(m));
        }
        RawEntity::Announcement(a) => {
            buckets
                .announcements
                .insert(a.id.clone(), announcement_record(a));
        }
        RawEntity::Marker(m) => {
            buckets.markers.insert(m.timeline.clone(), marker_record(m));
        }
    }
    buckets
}

#[derive(Default)]
struct Walker {
    buckets: NormalizedBuckets,
    visited: BTreeSet<(EntityType, EntityId)>,
}

impl Walker {
    /// Entry point for one top-level object; nested objects descend
    /// through the typed visit_* methods and are never roots.
    fn visit(&mut self, raw: &RawEntity) {
        self.buckets
            .roots
            .push((raw.entity_type(), raw.id().clone()));
        match raw {
            RawEntity::Account(a) => self.visit_account(a),
            RawEntity::Status(s) => self.visit_status(s),
            RawEntity::Notification(n) => self.visit_notification(n),
            RawEntity::Poll(p) => {
                self.buckets.polls.insert(p.id.clone(), poll_record(p));
            }
            RawEntity::Group(g) => {
                self.buckets.groups.insert(g.id.clone(), group_record(g));
            }
            RawEntity::Relationship(r) => {
                self.buckets
                    .relationships
                    .insert(r.id.clone(), relationship_record(r));
            }
            RawEntity::Chat(c) => self.visit_chat(c),
            RawEntity::ChatMessage(m) => {
                self.buckets
                    .chat_messages
                    .insert(m.id.clone(), chat_message_record(m));
            }
            RawEntity::Announcement(a) => {
                self.buckets
                    .announcements
                    .insert(a.id.clone(), announcement_record(a));
            }
            RawEntity::Marker(m) => {
                self.buckets
                    .markers
                    .insert(m.timeline.clone(), marker_record(m));
            }
        }
    }

    /// Record the visit; `false` means this ID was seen already in this
    /// call and the walk must not redescend (cycle guard).
    fn enter(&mut self, typ: EntityType, id: &EntityId) -> bool {
        self.visited.insert((typ, id.clone()))
    }

    fn visit_account(&mut self, raw: &RawAccount) {
        let descend = self.enter(EntityType::Account, &raw.id);
        self.buckets
            .accounts
            .insert(raw.id.clone(), account_record(raw));
        if !descend {
            return;
        }
        if let Some(moved) = &raw.moved {
            self.visit_account(moved);
        }
        if let Some(rel) = &raw.relationship {
            self.buckets
                .relationships
                .insert(rel.id.clone(), relationship_record(rel));
        }
    }

    fn visit_status(&mut self, raw: &RawStatus) {
        let descend = self.enter(EntityType::Status, &raw.id);
        self.buckets
            .statuses
            .insert(raw.id.clone(), status_record(raw));
        if !descend {
            return;
        }
        if let Some(account) = &raw.account {
            self.visit_account(account);
        }
        if let Some(reblog) = &raw.reblog {
            self.visit_status(reblog);
        }
        if let Some(quote) = &raw.quote {
            self.visit_status(quote);
        }
        if let Some(poll) = &raw.poll {
            self.buckets.polls.insert(poll.id.clone(), poll_record(poll));
        }
        if let Some(group) = &raw.group {
            self.buckets
                .groups
                .insert(group.id.clone(), group_record(group));
        }
    }

    fn visit_notification(&mut self, raw: &RawNotification) {
        let descend = self.enter(EntityType::Notification, &raw.id);
        self.buckets
            .notifications
            .insert(raw.id.clone(), notification_record(raw));
        if !descend {
            return;
        }
        if let Some(account) = &raw.account {
            self.visit_account(account);
        }
        if let Some(target) = &raw.target {
            self.visit_account(target);
        }
        if let Some(status) = &raw.status {
            self.visit_status(status);
        }
    }

    fn visit_chat(&mut self, raw: &RawChat) {
        let descend = self.enter(EntityType::Chat, &raw.id);
        self.buckets.chats.insert(raw.id.clone(), chat_record(raw));
        if !descend {
            return;
        }
        if let Some(account) = &raw.account {
            self.visit_account(account);
        }
        if let Some(message) = &raw.last_message {
            self.buckets
                .chat_messages
                .insert(message.id.clone(), chat_message_record(message));
        }
    }
}

// =============================================================================
// Raw -> stored conversions (embedding points become ID references)
// =============================================================================

fn account_record(raw: &RawAccount) -> Account {
    Account {
        id: raw.id.clone(),
        handle: raw.handle.clone(),
        display_name: raw.display_name.clone(),
        moved_id: raw.moved.as_ref().map(|m| m.id.clone()),
        note: raw.note.clone(),
        followers_count: raw.followers_count,
        following_count: raw.following_count,
        statuses_count: raw.statuses_count,
    }
}

fn status_record(raw: &RawStatus) -> Status {
    Status {
        id: raw.id.clone(),
        account_id: raw.account.as_ref().map(|a| a.id.clone()),
        reblog_id: raw.reblog.as_ref().map(|r| r.id.clone()),
        quote_id: raw.quote.as_ref().map(|q| q.id.clone()),
        poll_id: raw.poll.as_ref().map(|p| p.id.clone()),
        group_id: raw.group.as_ref().map(|g| g.id.clone()),
        content: raw.content.clone(),
        reactions: raw.reactions.clone(),
        favourites_count: raw.favourites_count,
        reblogs_count: raw.reblogs_count,
        favourited: raw.favourited,
        reblogged: raw.reblogged,
        created_at: raw.created_at,
    }
}

fn notification_record(raw: &RawNotification) -> Notification {
    Notification {
        id: raw.id.clone(),
        kind: raw.kind,
        account_id: raw.account.as_ref().map(|a| a.id.clone()),
        target_id: raw.target.as_ref().map(|t| t.id.clone()),
        status_id: raw.status.as_ref().map(|s| s.id.clone()),
        read: raw.read,
    }
}

fn poll_record(raw: &RawPoll) -> Poll {
    Poll {
        id: raw.id.clone(),
        options: raw
            .options
            .iter()
            .map(|(title, votes_count)| PollOption {
                title: title.clone(),
                votes_count: *votes_count,
            })
            .collect(),
        votes_count: raw.votes_count,
        voted: raw.voted,
        own_votes: raw.own_votes.clone(),
        expired: raw.expired,
    }
}

fn group_record(raw: &RawGroup) -> Group {
    Group {
        id: raw.id.clone(),
        display_name: raw.display_name.clone(),
        members_count: raw.members_count,
    }
}

fn relationship_record(raw: &RawRelationship) -> Relationship {
    Relationship {
        id: raw.id.clone(),
        following: raw.following,
        requested: raw.requested,
        followed_by: raw.followed_by,
        blocking: raw.blocking,
        muting: raw.muting,
    }
}

fn chat_record(raw: &RawChat) -> Chat {
    Chat {
        id: raw.id.clone(),
        account_id: raw.account.as_ref().map(|a| a.id.clone()),
        last_message_id: raw.last_message.as_ref().map(|m| m.id.clone()),
        last_message_at: raw.last_message.as_ref().and_then(|m| m.created_at),
        unread: raw.unread,
    }
}

fn chat_message_record(raw: &RawChatMessage) -> ChatMessage {
    ChatMessage {
        id: raw.id.clone(),
        chat_id: raw.chat_id.clone(),
        account_id: raw.account_id.clone(),
        content: raw.content.clone(),
        created_at: raw.created_at,
    }
}

fn announcement_record(raw: &RawAnnouncement) -> Announcement {
    Announcement {
        id: raw.id.clone(),
        content: raw.content.clone(),
        reactions: raw.reactions.clone(),
        read: raw.read,
    }
}

fn marker_record(raw: &RawMarker) -> Marker {
    Marker {
        timeline: raw.timeline.clone(),
        last_read_id: raw.last_read_id.clone(),
        version: raw.version,
    }
}
