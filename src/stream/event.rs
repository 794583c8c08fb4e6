//! Stream event schema.
//!
//! The live stream delivers ordered, at-least-once `{event, payload}`
//! messages. Decoding maps each known event name to a typed variant;
//! unknown names are an error the dispatcher logs and skips.

use serde_json::Value;
use thiserror::Error;

use crate::core::{
    EntityId, FollowEvent, MalformedPayload, RawAnnouncement, RawChat, RawMarker, RawNotification,
    RawStatus, decode_announcement, decode_chat, decode_marker, decode_notification, decode_status,
};

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum StreamError {
    #[error("unknown stream event `{name}`")]
    UnknownEvent { name: String },
    #[error("bad payload for `{event}`: {reason}")]
    BadPayload { event: &'static str, reason: String },
    #[error(transparent)]
    Malformed(#[from] MalformedPayload),
}

/// A decoded live-update event.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// New status for the connection's timeline.
    Update(Box<RawStatus>),
    /// Edit of an already-known status; not inserted into any list.
    StatusUpdate(Box<RawStatus>),
    /// Status deleted server-side; payload is its ID.
    Delete(EntityId),
    /// New notification; buffered, not applied immediately.
    Notification(Box<RawNotification>),
    /// Conversation summary changed; patched into the conversations
    /// query family as-is.
    Conversation(Value),
    /// Server-side filters changed; cached filter queries are stale.
    FiltersChanged,
    /// Chat received a message or changed shape.
    ChatUpdate(Box<RawChat>),
    /// Follow relationship converged; applied after a short delay.
    FollowRelationshipsUpdate {
        state: FollowEvent,
        follower: EntityId,
        following: EntityId,
    },
    Announcement(RawAnnouncement),
    AnnouncementReaction {
        announcement_id: EntityId,
        name: String,
        count: i64,
    },
    AnnouncementDelete(EntityId),
    /// Read markers moved; monotonic point-writes.
    Marker(Vec<RawMarker>),
}

fn payload_id(
    payload: &Value,
    event: &'static str,
    field: &str,
) -> Result<EntityId, StreamError> {
    let raw = match payload.get(field) {
        Some(v) => v.as_str(),
        None => payload.as_str(),
    };
    raw.and_then(|s| EntityId::parse(s).ok())
        .ok_or(StreamError::BadPayload {
            event,
            reason: format!("missing {field}"),
        })
}

fn account_id(payload: &Value, event: &'static str, field: &str) -> Result<EntityId, StreamError> {
    payload
        .get(field)
        .and_then(|a| a.get("id"))
        .and_then(Value::as_str)
        .and_then(|s| EntityId::parse(s).ok())
        .ok_or(StreamError::BadPayload {
            event,
            reason: format!("missing {field}.id"),
        })
}

/// Decode one wire message.
pub fn decode_stream_event(name: &str, payload: &Value) -> Result<StreamEvent, StreamError> {
    match name {
        "update" => Ok(StreamEvent::Update(Box::new(decode_status(payload)?))),
        "status.update" => Ok(StreamEvent::StatusUpdate(Box::new(decode_status(payload)?))),
        "delete" => {
            let id = payload
                .as_str()
                .and_then(|s| EntityId::parse(s).ok())
                .ok_or(StreamError::BadPayload {
                    event: "delete",
                    reason: "payload is not a status id".into(),
                })?;
            Ok(StreamEvent::Delete(id))
        }
        "notification" => Ok(StreamEvent::Notification(Box::new(decode_notification(
            payload,
        )?))),
        "conversation" => {
            if payload.get("id").and_then(Value::as_str).is_none() {
                return Err(StreamError::BadPayload {
                    event: "conversation",
                    reason: "missing id".into(),
                });
            }
            Ok(StreamEvent::Conversation(payload.clone()))
        }
        "filters_changed" => Ok(StreamEvent::FiltersChanged),
        "chat_update" => Ok(StreamEvent::ChatUpdate(Box::new(decode_chat(payload)?))),
        "follow_relationships_update" => {
            let state = payload
                .get("state")
                .and_then(Value::as_str)
                .and_then(FollowEvent::from_wire)
                .ok_or(StreamError::BadPayload {
                    event: "follow_relationships_update",
                    reason: "unknown state".into(),
                })?;
            Ok(StreamEvent::FollowRelationshipsUpdate {
                state,
                follower: account_id(payload, "follow_relationships_update", "follower")?,
                following: account_id(payload, "follow_relationships_update", "following")?,
            })
        }
        "announcement" => Ok(StreamEvent::Announcement(decode_announcement(payload)?)),
        "announcement.reaction" => Ok(StreamEvent::AnnouncementReaction {
            announcement_id: payload_id(payload, "announcement.reaction", "announcement_id")?,
            name: payload
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            count: payload.get("count").and_then(Value::as_i64).unwrap_or(0),
        }),
        "announcement.delete" => Ok(StreamEvent::AnnouncementDelete(payload_id(
            payload,
            "announcement.delete",
            "id",
        )?)),
        "marker" => {
            let map = payload.as_object().ok_or(StreamError::BadPayload {
                event: "marker",
                reason: "payload is not an object".into(),
            })?;
            // Malformed per-timeline entries are dropped, not fatal.
            let markers = map
                .iter()
                .filter_map(|(timeline, value)| decode_marker(timeline, value).ok())
                .collect();
            Ok(StreamEvent::Marker(markers))
        }
        other => Err(StreamError::UnknownEvent {
            name: other.to_string(),
        }),
    }
}
