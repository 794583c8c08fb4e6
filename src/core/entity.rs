//! Stored (normalized) entities.
//!
//! Every entity references other entities only by ID, never by embedding.
//! The wire shapes that do embed children live in `raw`; the normalizer
//! flattens them into these.

use serde::{Deserialize, Serialize};

use super::domain::{EntityType, NotificationKind};
use super::identity::{EntityId, Handle};
use super::time::WallClock;

/// One emoji reaction bucket on a status or announcement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    pub count: i64,
    pub me: bool,
}

/// Ordered reaction list, merged at field granularity.
///
/// This is the one composite field patched in place rather than replaced
/// wholesale on import; the same merge is used by optimistic counters and
/// streamed reaction events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reactions(Vec<Reaction>);

impl Reactions {
    pub fn new(entries: Vec<Reaction>) -> Self {
        Self(entries)
    }

    pub fn get(&self, name: &str) -> Option<&Reaction> {
        self.0.iter().find(|r| r.name == name)
    }

    pub fn as_slice(&self) -> &[Reaction] {
        &self.0
    }

    /// Increment-merge a single reaction bucket.
    ///
    /// `overwrite` replaces both `count` and `me` with the provided values
    /// (the optimistic-counter case, where the caller supplies the value it
    /// expects the server to hold). Without `overwrite`, `count` is a delta
    /// added to the existing bucket and `me` is left untouched. A missing
    /// bucket is inserted either way; a bucket that drops to zero or below
    /// is removed.
    pub fn merge(&mut self, name: &str, count: i64, me: bool, overwrite: bool) {
        match self.0.iter_mut().find(|r| r.name == name) {
            Some(entry) => {
                if overwrite {
                    entry.count = count;
                    entry.me = me;
                } else {
                    entry.count += count;
                }
                if entry.count <= 0 {
                    self.0.retain(|r| r.name != name);
                }
            }
            None => {
                if count > 0 {
                    self.0.push(Reaction {
                        name: name.to_string(),
                        count,
                        me,
                    });
                }
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: EntityId,
    pub handle: Handle,
    pub display_name: String,
    /// Account this one moved to, by ID.
    pub moved_id: Option<EntityId>,
    pub note: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub statuses_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: EntityId,
    pub account_id: Option<EntityId>,
    pub reblog_id: Option<EntityId>,
    pub quote_id: Option<EntityId>,
    pub poll_id: Option<EntityId>,
    pub group_id: Option<EntityId>,
    pub content: String,
    pub reactions: Reactions,
    pub favourites_count: i64,
    pub reblogs_count: i64,
    pub favourited: bool,
    pub reblogged: bool,
    pub created_at: Option<WallClock>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: EntityId,
    pub kind: NotificationKind,
    pub account_id: Option<EntityId>,
    /// Move notifications carry the account moved to.
    pub target_id: Option<EntityId>,
    pub status_id: Option<EntityId>,
    pub read: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub title: String,
    pub votes_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: EntityId,
    pub options: Vec<PollOption>,
    pub votes_count: u64,
    pub voted: bool,
    pub own_votes: Vec<usize>,
    pub expired: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub display_name: String,
    pub members_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Same ID as the account it describes.
    pub id: EntityId,
    pub following: bool,
    pub requested: bool,
    pub followed_by: bool,
    pub blocking: bool,
    pub muting: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: EntityId,
    pub account_id: Option<EntityId>,
    pub last_message_id: Option<EntityId>,
    pub last_message_at: Option<WallClock>,
    pub unread: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: EntityId,
    pub chat_id: Option<EntityId>,
    pub account_id: Option<EntityId>,
    pub content: String,
    pub created_at: Option<WallClock>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: EntityId,
    pub content: String,
    pub reactions: Reactions,
    pub read: bool,
}

/// Per-timeline read marker. Monotonic server state: point-written, never
/// merged. Stored under the timeline name as its ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub timeline: EntityId,
    pub last_read_id: EntityId,
    pub version: u64,
}

/// Tagged union over every stored entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Account(Account),
    Status(Status),
    Notification(Notification),
    Poll(Poll),
    Group(Group),
    Relationship(Relationship),
    Chat(Chat),
    ChatMessage(ChatMessage),
    Announcement(Announcement),
    Marker(Marker),
}

impl Entity {
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

    pub fn as_account(&self) -> Option<&Account> {
        match self {
            Self::Account(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<&Status> {
        match self {
            Self::Status(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            Self::Notification(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Self::Relationship(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_chat(&self) -> Option<&Chat> {
        match self {
            Self::Chat(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_chat_message(&self) -> Option<&ChatMessage> {
        match self {
            Self::ChatMessage(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_announcement(&self) -> Option<&Announcement> {
        match self {
            Self::Announcement(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Self::Marker(e) => Some(e),
            _ => None,
        }
    }
}
