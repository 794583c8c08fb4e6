//! Domain enums.
//!
//! EntityType: the type namespaces of the cache
//! InsertPosition: where list imports insert new IDs
//! NotificationKind / FollowEvent: streamed event classifications

use serde::{Deserialize, Serialize};

/// Entity type namespace. One store partition exists per variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Account,
    Status,
    Notification,
    Poll,
    Group,
    Relationship,
    Chat,
    ChatMessage,
    Announcement,
    Marker,
}

impl EntityType {
    pub const ALL: [EntityType; 10] = [
        Self::Account,
        Self::Status,
        Self::Notification,
        Self::Poll,
        Self::Group,
        Self::Relationship,
        Self::Chat,
        Self::ChatMessage,
        Self::Announcement,
        Self::Marker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Status => "status",
            Self::Notification => "notification",
            Self::Poll => "poll",
            Self::Group => "group",
            Self::Relationship => "relationship",
            Self::Chat => "chat",
            Self::ChatMessage => "chat_message",
            Self::Announcement => "announcement",
            Self::Marker => "marker",
        }
    }
}

/// Where an import inserts IDs into a list. Existing order is preserved
/// for IDs already present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Start,
    #[default]
    End,
}

/// Classification carried by notification entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    FollowRequest,
    Mention,
    Reblog,
    Favourite,
    Poll,
    Status,
    Move,
    ChatMention,
    Other,
}

impl NotificationKind {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "follow" => Self::Follow,
            "follow_request" => Self::FollowRequest,
            "mention" => Self::Mention,
            "reblog" => Self::Reblog,
            "favourite" => Self::Favourite,
            "poll" => Self::Poll,
            "status" => Self::Status,
            "move" => Self::Move,
            "chat_mention" => Self::ChatMention,
            _ => Self::Other,
        }
    }
}

/// Follow-relationship transition carried on the stream.
///
/// Each variant resolves to a fixed relationship field patch; the patch is
/// applied after a short delay so an in-flight REST confirmation for the
/// same action can land first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowEvent {
    FollowPending,
    FollowAccept,
    FollowReject,
}

impl FollowEvent {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "follow_pending" => Some(Self::FollowPending),
            "follow_accept" => Some(Self::FollowAccept),
            "follow_reject" => Some(Self::FollowReject),
            _ => None,
        }
    }

    /// The `(following, requested)` pair this event converges to.
    pub fn resolved_fields(self) -> (bool, bool) {
        match self {
            Self::FollowPending => (false, true),
            Self::FollowAccept => (true, false),
            Self::FollowReject => (false, false),
        }
    }
}
