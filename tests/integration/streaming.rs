//! A live session: fetch a timeline, then reconcile stream events onto it.

use fedicache::core::{select_entities, select_entity};
use fedicache::stream::{Dispatcher, NOTIFICATIONS_LIST, decode_stream_event};
use fedicache::{
    CacheState, Entity, EntityType, FetchCoordinator, FetchOpts, StreamConfig, WallClock,
};
use serde_json::json;

use crate::fixtures::remote::{ScriptedPage, ScriptedRemote};
use crate::fixtures::wire::{chat_json, id, key, notification_json, status_json};

fn session_config() -> StreamConfig {
    StreamConfig {
        current_user: Some(id("me")),
        ..StreamConfig::default()
    }
}

#[test]
fn streamed_status_lands_on_top_of_the_fetched_timeline() {
    let mut state = CacheState::new();
    let remote = ScriptedRemote::new();
    remote.push_page(ScriptedPage::statuses(
        vec![status_json("1", "42", "alice")],
        None,
    ));
    FetchCoordinator::new(60_000).fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(1_000),
    );

    let mut dispatcher = Dispatcher::new(session_config());
    dispatcher.handle_message(
        &mut state,
        "update",
        &status_json("2", "7", "bob"),
        WallClock(2_000),
    );

    let home = select_entities(&state, EntityType::Status, &key("home"));
    let ids: Vec<&str> = home.iter().map(|e| e.id().as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    // The streamed author was normalized alongside.
    assert!(state.store(EntityType::Account).contains(&id("7")));
}

#[test]
fn streamed_delete_is_an_echo_of_our_own_delete() {
    let mut state = CacheState::new();
    let mut dispatcher = Dispatcher::new(session_config());
    dispatcher.handle_message(
        &mut state,
        "update",
        &status_json("1", "42", "alice"),
        WallClock(0),
    );

    // Locally deleted first; the later stream echo must be a no-op.
    state.apply(fedicache::CacheOp::Delete {
        typ: EntityType::Status,
        ids: vec![id("1")],
        preserve_lists: false,
    });
    let outcome = dispatcher.handle_message(&mut state, "delete", &json!("1"), WallClock(100));
    assert!(outcome.is_empty());
    assert!(select_entity(&state, EntityType::Status, &id("1")).is_none());
}

#[test]
fn notifications_accumulate_until_the_user_asks() {
    let mut state = CacheState::new();
    let mut dispatcher = Dispatcher::new(session_config());

    for n in 1..=3u64 {
        dispatcher.handle_message(
            &mut state,
            "notification",
            &notification_json(&format!("n{n}"), &format!("s{n}")),
            WallClock(n),
        );
    }
    let list = key(NOTIFICATIONS_LIST);
    assert!(select_entities(&state, EntityType::Notification, &list).is_empty());
    assert_eq!(dispatcher.queued_notification_count(), 3);

    dispatcher.dequeue_notifications(&mut state);
    assert_eq!(
        select_entities(&state, EntityType::Notification, &list).len(),
        3
    );
    // Embedded statuses and accounts came along.
    assert!(state.store(EntityType::Status).contains(&id("s1")));
    assert!(state.store(EntityType::Account).contains(&id("42")));
}

#[test]
fn follow_confirmation_applies_after_the_grace_period() {
    let mut state = CacheState::new();
    let mut dispatcher = Dispatcher::new(session_config());

    dispatcher.handle_message(
        &mut state,
        "follow_relationships_update",
        &json!({
            "state": "follow_pending",
            "follower": { "id": "me" },
            "following": { "id": "42" },
        }),
        WallClock(10_000),
    );

    dispatcher.tick(&mut state, WallClock(10_200));
    assert!(select_entity(&state, EntityType::Relationship, &id("42")).is_none());

    dispatcher.tick(&mut state, WallClock(10_400));
    let rel = select_entity(&state, EntityType::Relationship, &id("42"))
        .and_then(Entity::as_relationship)
        .unwrap();
    assert!(!rel.following);
    assert!(rel.requested);
}

#[test]
fn chat_events_drive_recency_and_ignore_own_echo() {
    let mut state = CacheState::new();
    let mut dispatcher = Dispatcher::new(session_config());

    dispatcher.handle_message(
        &mut state,
        "chat_update",
        &chat_json("c1", "m1", "partner", "2024-06-01T10:00:00Z"),
        WallClock(0),
    );
    assert!(state.store(EntityType::Chat).contains(&id("c1")));
    assert!(state.store(EntityType::ChatMessage).contains(&id("m1")));

    // Our own send echoed back over the stream changes nothing.
    let outcome = dispatcher.handle_message(
        &mut state,
        "chat_update",
        &chat_json("c1", "m2", "me", "2024-06-01T10:01:00Z"),
        WallClock(100),
    );
    assert!(outcome.is_empty());
    assert!(!state.store(EntityType::ChatMessage).contains(&id("m2")));
}

#[test]
fn events_flow_through_a_channel_in_order() {
    let (tx, rx) = crossbeam::channel::unbounded();
    for (name, payload) in [
        ("update", status_json("1", "42", "alice")),
        ("announcement", json!({ "id": "a1", "content": "maintenance" })),
        (
            "announcement.reaction",
            json!({ "announcement_id": "a1", "name": "👍", "count": 2 }),
        ),
    ] {
        tx.send(decode_stream_event(name, &payload).unwrap()).unwrap();
    }

    let mut state = CacheState::new();
    let mut dispatcher = Dispatcher::new(session_config());
    dispatcher.drain(&mut state, &rx, WallClock(0));

    assert!(state.store(EntityType::Status).contains(&id("1")));
    let announcement = select_entity(&state, EntityType::Announcement, &id("a1"))
        .and_then(Entity::as_announcement)
        .unwrap();
    assert_eq!(announcement.reactions.get("👍").unwrap().count, 2);
}
