//! Streaming reconciliation dispatcher.
//!
//! A single ordered consumer mapping each live event to cache primitives:
//! store imports, list mutations, query-cache patches. Events arrive
//! at-least-once; every action here is idempotent by ID.
//!
//! Notifications are buffered and merged only on an explicit dequeue
//! trigger so the visible list does not jump while the user is reading.
//! Follow-relationship patches are delayed a short, tunable interval so an
//! in-flight REST confirmation for the same action can land first.

use std::collections::VecDeque;

use crossbeam::channel::Receiver;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::event::{StreamEvent, decode_stream_event};
use crate::config::StreamConfig;
use crate::core::{
    ApplyOutcome, CacheOp, CacheState, Chat, ChatMessage, Entity, EntityId, EntityType,
    FollowEvent, InsertPosition, ListKey, QueryKey, RawNotification, Relationship, id_matcher,
    normalize, normalize_all, normalize_shallow,
};

/// Side effects fired for events that should reach the user's senses
/// (sound, unread badge). Only others' messages trigger them.
pub trait StreamEffects {
    fn on_incoming_chat(&mut self, _chat: &Chat, _message: &ChatMessage) {}
}

/// Effects sink that does nothing.
pub struct NoEffects;

impl StreamEffects for NoEffects {}

/// List key the dispatcher merges notifications into.
pub const NOTIFICATIONS_LIST: &str = "notifications";
/// List key announcements accumulate in.
pub const ANNOUNCEMENTS_LIST: &str = "announcements";

fn query_timeline(list: &ListKey) -> QueryKey {
    QueryKey::with_params("timeline", [list.as_str()])
}

fn query_timelines() -> QueryKey {
    QueryKey::new("timeline")
}

fn query_chats() -> QueryKey {
    QueryKey::new("chats")
}

fn query_chat_messages(chat_id: &EntityId) -> QueryKey {
    QueryKey::with_params("chat_messages", [chat_id.as_str()])
}

fn query_conversations() -> QueryKey {
    QueryKey::new("conversations")
}

fn query_filters() -> QueryKey {
    QueryKey::new("filters")
}

fn to_item<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// A relationship patch waiting out its convergence delay.
#[derive(Clone, Debug, PartialEq)]
struct PendingRelationship {
    due: crate::core::WallClock,
    account_id: EntityId,
    following: bool,
    requested: bool,
}

/// The single consumer.
pub struct Dispatcher {
    config: StreamConfig,
    effects: Box<dyn StreamEffects + Send>,
    queued_notifications: VecDeque<RawNotification>,
    dropped_notifications: u64,
    pending_relationships: Vec<PendingRelationship>,
}

impl Dispatcher {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_effects(config, Box::new(NoEffects))
    }

    pub fn with_effects(config: StreamConfig, effects: Box<dyn StreamEffects + Send>) -> Self {
        Self {
            config,
            effects,
            queued_notifications: VecDeque::new(),
            dropped_notifications: 0,
            pending_relationships: Vec::new(),
        }
    }

    /// Notifications buffered and not yet merged.
    pub fn queued_notification_count(&self) -> usize {
        self.queued_notifications.len()
    }

    /// Notifications dropped because the buffer was full.
    pub fn dropped_notification_count(&self) -> u64 {
        self.dropped_notifications
    }

    /// Decode and handle one wire message; unknown events are logged and
    /// skipped, bad payloads likewise.
    pub fn handle_message(
        &mut self,
        state: &mut CacheState,
        name: &str,
        payload: &Value,
        now: crate::core::WallClock,
    ) -> ApplyOutcome {
        match decode_stream_event(name, payload) {
            Ok(event) => self.handle(state, event, now),
            Err(err) => {
                warn!(event = name, error = %err, "stream event skipped");
                ApplyOutcome::default()
            }
        }
    }

    /// Drain every event currently buffered on the channel.
    pub fn drain(
        &mut self,
        state: &mut CacheState,
        receiver: &Receiver<StreamEvent>,
        now: crate::core::WallClock,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        while let Ok(event) = receiver.try_recv() {
            outcome.merge(self.handle(state, event, now));
        }
        outcome.merge(self.tick(state, now));
        outcome
    }

    /// Apply one event's reconciliation.
    pub fn handle(
        &mut self,
        state: &mut CacheState,
        event: StreamEvent,
        now: crate::core::WallClock,
    ) -> ApplyOutcome {
        match event {
            StreamEvent::Update(status) => self.on_update(state, &status, true),
            StreamEvent::StatusUpdate(status) => self.on_update(state, &status, false),
            StreamEvent::Delete(id) => self.on_delete(state, &id),
            StreamEvent::Notification(notification) => {
                self.on_notification(*notification);
                ApplyOutcome::default()
            }
            StreamEvent::Conversation(payload) => {
                let queries = state.queries_mut();
                queries.update_item_family(&query_conversations(), &payload, &id_matcher);
                queries.append_item_if_absent(&query_conversations(), payload);
                ApplyOutcome::default()
            }
            StreamEvent::FiltersChanged => {
                state.queries_mut().remove_family(&query_filters());
                ApplyOutcome::default()
            }
            StreamEvent::ChatUpdate(chat) => self.on_chat_update(state, &chat),
            StreamEvent::FollowRelationshipsUpdate {
                state: follow,
                follower,
                following,
            } => {
                self.on_follow_update(follow, follower, following, now);
                ApplyOutcome::default()
            }
            StreamEvent::Announcement(announcement) => {
                let raw = crate::core::RawEntity::Announcement(announcement);
                let ops = normalize_shallow(&raw).into_ops(Some((
                    EntityType::Announcement,
                    ListKey::parse(ANNOUNCEMENTS_LIST).expect("constant key is valid"),
                    InsertPosition::End,
                )));
                state.apply_batch(ops)
            }
            StreamEvent::AnnouncementReaction {
                announcement_id,
                name,
                count,
            } => self.on_announcement_reaction(state, &announcement_id, &name, count),
            StreamEvent::AnnouncementDelete(id) => state.apply(CacheOp::Delete {
                typ: EntityType::Announcement,
                ids: vec![id],
                preserve_lists: false,
            }),
            StreamEvent::Marker(markers) => state.apply(CacheOp::Import {
                typ: EntityType::Marker,
                entities: markers.iter().map(|m| {
                    Entity::Marker(crate::core::Marker {
                        timeline: m.timeline.clone(),
                        last_read_id: m.last_read_id.clone(),
                        version: m.version,
                    })
                }).collect(),
                list: None,
                position: InsertPosition::End,
            }),
        }
    }

    /// Apply relationship patches whose delay has elapsed.
    pub fn tick(&mut self, state: &mut CacheState, now: crate::core::WallClock) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        let due: Vec<PendingRelationship> = {
            let (ready, waiting) = std::mem::take(&mut self.pending_relationships)
                .into_iter()
                .partition(|p| p.due <= now);
            self.pending_relationships = waiting;
            ready
        };
        for patch in due {
            let mut relationship = state
                .store(EntityType::Relationship)
                .get(&patch.account_id)
                .and_then(Entity::as_relationship)
                .cloned()
                .unwrap_or(Relationship {
                    id: patch.account_id.clone(),
                    ..Relationship::default()
                });
            relationship.following = patch.following;
            relationship.requested = patch.requested;
            outcome.merge(state.apply(CacheOp::Import {
                typ: EntityType::Relationship,
                entities: vec![Entity::Relationship(relationship)],
                list: None,
                position: InsertPosition::End,
            }));
        }
        outcome
    }

    /// Merge the buffered notifications into the visible list (the
    /// explicit trigger, e.g. the user scrolled to top).
    pub fn dequeue_notifications(&mut self, state: &mut CacheState) -> ApplyOutcome {
        let queued: Vec<RawNotification> = self.queued_notifications.drain(..).collect();
        if queued.is_empty() {
            return ApplyOutcome::default();
        }
        let raws: Vec<crate::core::RawEntity> = queued
            .into_iter()
            .map(|n| crate::core::RawEntity::Notification(Box::new(n)))
            .collect();
        let ops = normalize_all(raws.iter()).into_ops(Some((
            EntityType::Notification,
            ListKey::parse(NOTIFICATIONS_LIST).expect("constant key is valid"),
            InsertPosition::Start,
        )));
        state.apply_batch(ops)
    }

    fn on_update(
        &mut self,
        state: &mut CacheState,
        status: &crate::core::RawStatus,
        insert_into_timeline: bool,
    ) -> ApplyOutcome {
        let raw = crate::core::RawEntity::Status(Box::new(status.clone()));
        let list = insert_into_timeline.then(|| {
            (
                EntityType::Status,
                self.config.timeline.clone(),
                InsertPosition::Start,
            )
        });
        let outcome = state.apply_batch(normalize(&raw).into_ops(list));

        // Keep paginated timeline views in agreement with the store.
        if let Some(Entity::Status(stored)) = state.store(EntityType::Status).get(&status.id) {
            let item = to_item(stored);
            let key = query_timeline(&self.config.timeline);
            let queries = state.queries_mut();
            queries.update_item_family(&query_timelines(), &item, &id_matcher);
            if insert_into_timeline {
                queries.append_item_if_absent(&key, item);
            }
        }
        outcome
    }

    fn on_delete(&mut self, state: &mut CacheState, id: &EntityId) -> ApplyOutcome {
        let outcome = state.apply(CacheOp::Delete {
            typ: EntityType::Status,
            ids: vec![id.clone()],
            preserve_lists: false,
        });
        let target = serde_json::json!({ "id": id.as_str() });
        state
            .queries_mut()
            .remove_item_family(&query_timelines(), &target, &id_matcher);
        outcome
    }

    fn on_notification(&mut self, notification: RawNotification) {
        if self.queued_notifications.len() >= self.config.notification_queue_cap {
            self.queued_notifications.pop_front();
            self.dropped_notifications += 1;
            debug!("notification queue full; oldest dropped");
        }
        self.queued_notifications.push_back(notification);
    }

    fn on_chat_update(&mut self, state: &mut CacheState, chat: &crate::core::RawChat) -> ApplyOutcome {
        // Our own sends already produced an optimistic copy.
        if let (Some(me), Some(message)) = (&self.config.current_user, &chat.last_message)
            && message.account_id.as_ref() == Some(me)
        {
            debug!(chat = %chat.id, "own chat message ignored");
            return ApplyOutcome::default();
        }

        let raw = crate::core::RawEntity::Chat(Box::new(chat.clone()));
        let outcome = state.apply_batch(normalize(&raw).into_ops(None));

        let stored_chat = state
            .store(EntityType::Chat)
            .get(&chat.id)
            .and_then(Entity::as_chat)
            .cloned();
        if let Some(stored_chat) = stored_chat {
            let stored_message = chat
                .last_message
                .as_ref()
                .and_then(|m| {
                    state
                        .store(EntityType::ChatMessage)
                        .get(&m.id)
                        .and_then(Entity::as_chat_message)
                })
                .cloned();

            let chat_item = to_item(&stored_chat);
            let queries = state.queries_mut();
            queries.update_item_family(&query_chats(), &chat_item, &id_matcher);
            queries.append_item_if_absent(&query_chats(), chat_item);
            if let Some(message) = &stored_message {
                queries.append_item_if_absent(&query_chat_messages(&chat.id), to_item(message));
            }
            // Most recent activity first.
            queries.resort_family(
                &query_chats(),
                &|a, b| {
                    let at = |v: &Value| v.get("last_message_at").and_then(Value::as_u64);
                    at(b).cmp(&at(a))
                },
                self.config.page_size,
            );

            if let Some(message) = &stored_message {
                self.effects.on_incoming_chat(&stored_chat, message);
            }
        }
        outcome
    }

    fn on_follow_update(
        &mut self,
        follow: FollowEvent,
        follower: EntityId,
        following: EntityId,
        now: crate::core::WallClock,
    ) {
        // The patched relationship is the one describing the other account.
        let target = match &self.config.current_user {
            Some(me) if *me == follower => following,
            Some(me) if *me == following => follower,
            _ => following,
        };
        let (following_flag, requested) = follow.resolved_fields();
        self.pending_relationships.push(PendingRelationship {
            due: now.saturating_add_ms(self.config.relationship_delay_ms),
            account_id: target,
            following: following_flag,
            requested,
        });
    }

    fn on_announcement_reaction(
        &mut self,
        state: &mut CacheState,
        announcement_id: &EntityId,
        name: &str,
        count: i64,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        if let Some(Entity::Announcement(announcement)) = state
            .store_mut(EntityType::Announcement)
            .get_mut(announcement_id)
        {
            // Server count is authoritative; our own `me` flag survives.
            let me = announcement.reactions.get(name).is_some_and(|r| r.me);
            announcement.reactions.merge(name, count, me, true);
            outcome
                .changed_entities
                .insert((EntityType::Announcement, announcement_id.clone()));
        }
        outcome
    }
}
