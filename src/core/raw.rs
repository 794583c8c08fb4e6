//! Wire (denormalized) entity shapes and their total decoders.
//!
//! The remote API returns entity graphs that embed children: a status
//! carries its author, its reblogged status, its poll. These shapes exist
//! only between decode and normalize; nothing downstream of the normalizer
//! ever sees an embedded child.
//!
//! Decoding is repair-oriented: missing optional fields get defaults and
//! malformed array elements are dropped, never fatal. Only a wholesale
//! top-level shape mismatch (not an object, or no usable `id`) is an error.

use serde_json::Value;

use super::domain::{EntityType, NotificationKind};
use super::entity::{Reaction, Reactions};
use super::error::MalformedPayload;
use super::identity::{EntityId, Handle};
use super::time::WallClock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    pub id: EntityId,
    pub handle: Handle,
    pub display_name: String,
    pub note: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub statuses_count: u64,
    pub moved: Option<Box<RawAccount>>,
    pub relationship: Option<RawRelationship>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawStatus {
    pub id: EntityId,
    pub content: String,
    pub created_at: Option<WallClock>,
    pub account: Option<Box<RawAccount>>,
    pub reblog: Option<Box<RawStatus>>,
    pub quote: Option<Box<RawStatus>>,
    pub poll: Option<RawPoll>,
    pub group: Option<RawGroup>,
    pub reactions: Reactions,
    pub favourites_count: i64,
    pub reblogs_count: i64,
    pub favourited: bool,
    pub reblogged: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawNotification {
    pub id: EntityId,
    pub kind: NotificationKind,
    pub account: Option<Box<RawAccount>>,
    pub target: Option<Box<RawAccount>>,
    pub status: Option<Box<RawStatus>>,
    pub read: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPoll {
    pub id: EntityId,
    pub options: Vec<(String, u64)>,
    pub votes_count: u64,
    pub voted: bool,
    pub own_votes: Vec<usize>,
    pub expired: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawGroup {
    pub id: EntityId,
    pub display_name: String,
    pub members_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRelationship {
    pub id: EntityId,
    pub following: bool,
    pub requested: bool,
    pub followed_by: bool,
    pub blocking: bool,
    pub muting: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChat {
    pub id: EntityId,
    pub account: Option<Box<RawAccount>>,
    pub last_message: Option<Box<RawChatMessage>>,
    pub unread: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChatMessage {
    pub id: EntityId,
    pub chat_id: Option<EntityId>,
    pub account_id: Option<EntityId>,
    pub content: String,
    pub created_at: Option<WallClock>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAnnouncement {
    pub id: EntityId,
    pub content: String,
    pub reactions: Reactions,
    pub read: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMarker {
    pub timeline: EntityId,
    pub last_read_id: EntityId,
    pub version: u64,
}

/// Tagged union over every wire shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawEntity {
    Account(Box<RawAccount>),
    Status(Box<RawStatus>),
    Notification(Box<RawNotification>),
    Poll(RawPoll),
    Group(RawGroup),
    Relationship(RawRelationship),
    Chat(Box<RawChat>),
    ChatMessage(RawChatMessage),
    Announcement(RawAnnouncement),
    Marker(RawMarker),
}

impl RawEntity {
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Account(e) => &e.id,
            Self::Status(e) => &e.id,
            Self::Notification(e) => &e.id,
            Self::Poll(e) => &e.id,
            Self::Group(e) => &e.id,
            Self::Relationship(e) => &e.id,
            Self::Chat(e) => &e.id,
            Self::ChatMessage(e) => &e.id,
            Self::Announcement(e) => &e.id,
            Self::Marker(e) => &e.timeline,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Account(_) => EntityType::Account,
            Self::Status(_) => EntityType::Status,
            Self::Notification(_) => EntityType::Notification,
            Self::Poll(_) => EntityType::Poll,
            Self::Group(_) => EntityType::Group,
            Self::Relationship(_) => EntityType::Relationship,
            Self::Chat(_) => EntityType::Chat,
            Self::ChatMessage(_) => EntityType::ChatMessage,
            Self::Announcement(_) => EntityType::Announcement,
            Self::Marker(_) => EntityType::Marker,
        }
    }
}

// =============================================================================
// Field accessors with repair defaults
// =============================================================================

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u64_field(v: &Value, key: &str) -> u64 {
    v.get(key).and_then(Value::as_u64).unwrap_or_default()
}

fn i64_field(v: &Value, key: &str) -> i64 {
    v.get(key).and_then(Value::as_i64).unwrap_or_default()
}

fn bool_field(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or_default()
}

fn time_field(v: &Value, key: &str) -> Option<WallClock> {
    v.get(key)
        .and_then(Value::as_str)
        .and_then(WallClock::parse_rfc3339)
}

fn id_field(v: &Value, key: &str) -> Option<EntityId> {
    v.get(key)
        .and_then(Value::as_str)
        .and_then(|s| EntityId::parse(s).ok())
}

/// Extract the mandatory `id`; the one thing repair cannot conjure.
fn require_id(v: &Value, entity_type: &'static str) -> Result<EntityId, MalformedPayload> {
    if !v.is_object() {
        return Err(MalformedPayload {
            entity_type,
            reason: "not an object".into(),
        });
    }
    id_field(v, "id").ok_or(MalformedPayload {
        entity_type,
        reason: "missing or empty id".into(),
    })
}

fn reactions_field(v: &Value, key: &str) -> Reactions {
    let entries = v
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|item| {
                    // Reactions without a name are unusable; drop them.
                    let name = item.get("name")?.as_str()?;
                    if name.is_empty() {
                        return None;
                    }
                    Some(Reaction {
                        name: name.to_string(),
                        count: i64_field(item, "count"),
                        me: bool_field(item, "me"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Reactions::new(entries)
}

// =============================================================================
// Decoders
// =============================================================================

pub fn decode_account(v: &Value) -> Result<RawAccount, MalformedPayload> {
    let id = require_id(v, "account")?;
    let handle = Handle::parse(str_field(v, "acct"))
        .unwrap_or_else(|_| Handle::parse(id.as_str()).expect("entity id is non-empty"));
    Ok(RawAccount {
        id,
        handle,
        display_name: str_field(v, "display_name"),
        note: str_field(v, "note"),
        followers_count: u64_field(v, "followers_count"),
        following_count: u64_field(v, "following_count"),
        statuses_count: u64_field(v, "statuses_count"),
        moved: v
            .get("moved")
            .and_then(|m| decode_account(m).ok())
            .map(Box::new),
        relationship: v
            .get("relationship")
            .and_then(|r| decode_relationship(r).ok()),
    })
}

pub fn decode_status(v: &Value) -> Result<RawStatus, MalformedPayload> {
    let id = require_id(v, "status")?;
    Ok(RawStatus {
        id,
        content: str_field(v, "content"),
        created_at: time_field(v, "created_at"),
        account: v
            .get("account")
            .and_then(|a| decode_account(a).ok())
            .map(Box::new),
        reblog: v
            .get("reblog")
            .and_then(|r| decode_status(r).ok())
            .map(Box::new),
        quote: v
            .get("quote")
            .and_then(|q| decode_status(q).ok())
            .map(Box::new),
        poll: v.get("poll").and_then(|p| decode_poll(p).ok()),
        group: v.get("group").and_then(|g| decode_group(g).ok()),
        reactions: reactions_field(v, "reactions"),
        favourites_count: i64_field(v, "favourites_count"),
        reblogs_count: i64_field(v, "reblogs_count"),
        favourited: bool_field(v, "favourited"),
        reblogged: bool_field(v, "reblogged"),
    })
}

pub fn decode_notification(v: &Value) -> Result<RawNotification, MalformedPayload> {
    let id = require_id(v, "notification")?;
    Ok(RawNotification {
        id,
        kind: NotificationKind::from_wire(&str_field(v, "type")),
        account: v
            .get("account")
            .and_then(|a| decode_account(a).ok())
            .map(Box::new),
        target: v
            .get("target")
            .and_then(|t| decode_account(t).ok())
            .map(Box::new),
        status: v
            .get("status")
            .and_then(|s| decode_status(s).ok())
            .map(Box::new),
        read: bool_field(v, "read"),
    })
}

pub fn decode_poll(v: &Value) -> Result<RawPoll, MalformedPayload> {
    let id = require_id(v, "poll")?;
    let options = v
        .get("options")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|o| {
                    let title = o.get("title")?.as_str()?;
                    Some((title.to_string(), u64_field(o, "votes_count")))
                })
                .collect()
        })
        .unwrap_or_default();
    let own_votes = v
        .get("own_votes")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|n| n.as_u64().map(|n| n as usize))
                .collect()
        })
        .unwrap_or_default();
    Ok(RawPoll {
        id,
        options,
        votes_count: u64_field(v, "votes_count"),
        voted: bool_field(v, "voted"),
        own_votes,
        expired: bool_field(v, "expired"),
    })
}

pub fn decode_group(v: &Value) -> Result<RawGroup, MalformedPayload> {
    let id = require_id(v, "group")?;
    Ok(RawGroup {
        id,
        display_name: str_field(v, "display_name"),
        members_count: u64_field(v, "members_count"),
    })
}

pub fn decode_relationship(v: &Value) -> Result<RawRelationship, MalformedPayload> {
    let id = require_id(v, "relationship")?;
    Ok(RawRelationship {
        id,
        following: bool_field(v, "following"),
        requested: bool_field(v, "requested"),
        followed_by: bool_field(v, "followed_by"),
        blocking: bool_field(v, "blocking"),
        muting: bool_field(v, "muting"),
    })
}

pub fn decode_chat(v: &Value) -> Result<RawChat, MalformedPayload> {
    let id = require_id(v, "chat")?;
    Ok(RawChat {
        id,
        account: v
            .get("account")
            .and_then(|a| decode_account(a).ok())
            .map(Box::new),
        last_message: v
            .get("last_message")
            .and_then(|m| decode_chat_message(m).ok())
            .map(Box::new),
        unread: u64_field(v, "unread"),
    })
}

pub fn decode_chat_message(v: &Value) -> Result<RawChatMessage, MalformedPayload> {
    let id = require_id(v, "chat_message")?;
    Ok(RawChatMessage {
        id,
        chat_id: id_field(v, "chat_id"),
        account_id: id_field(v, "account_id"),
        content: str_field(v, "content"),
        created_at: time_field(v, "created_at"),
    })
}

pub fn decode_announcement(v: &Value) -> Result<RawAnnouncement, MalformedPayload> {
    let id = require_id(v, "announcement")?;
    Ok(RawAnnouncement {
        id,
        content: str_field(v, "content"),
        reactions: reactions_field(v, "reactions"),
        read: bool_field(v, "read"),
    })
}

pub fn decode_marker(timeline: &str, v: &Value) -> Result<RawMarker, MalformedPayload> {
    let timeline = EntityId::parse(timeline).map_err(|_| MalformedPayload {
        entity_type: "marker",
        reason: "empty timeline name".into(),
    })?;
    let last_read_id = id_field(v, "last_read_id").ok_or(MalformedPayload {
        entity_type: "marker",
        reason: "missing last_read_id".into(),
    })?;
    Ok(RawMarker {
        timeline,
        last_read_id,
        version: u64_field(v, "version"),
    })
}

/// Decode a payload as the given type.
pub fn decode_entity(typ: EntityType, v: &Value) -> Result<RawEntity, MalformedPayload> {
    Ok(match typ {
        EntityType::Account => RawEntity::Account(Box::new(decode_account(v)?)),
        EntityType::Status => RawEntity::Status(Box::new(decode_status(v)?)),
        EntityType::Notification => RawEntity::Notification(Box::new(decode_notification(v)?)),
        EntityType::Poll => RawEntity::Poll(decode_poll(v)?),
        EntityType::Group => RawEntity::Group(decode_group(v)?),
        EntityType::Relationship => RawEntity::Relationship(decode_relationship(v)?),
        EntityType::Chat => RawEntity::Chat(Box::new(decode_chat(v)?)),
        EntityType::ChatMessage => RawEntity::ChatMessage(decode_chat_message(v)?),
        EntityType::Announcement => RawEntity::Announcement(decode_announcement(v)?),
        EntityType::Marker => {
            let timeline = str_field(v, "timeline");
            RawEntity::Marker(decode_marker(&timeline, v)?)
        }
    })
}
