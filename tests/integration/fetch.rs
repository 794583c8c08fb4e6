//! Fetch lifecycle: staleness, pagination, supersession.

use fedicache::core::{select_entities, select_list_state};
use fedicache::{
    AbortHandle, EntityType, FetchCoordinator, FetchOpts, FetchOutcome, InsertPosition, WallClock,
};

use crate::fixtures::remote::{ScriptedPage, ScriptedRemote};
use crate::fixtures::wire::{id, key, status_json};

#[test]
fn paginate_appends_and_advances_cursor() {
    let mut state = fedicache::CacheState::new();
    let remote = ScriptedRemote::new();
    remote.push_page(ScriptedPage::statuses(
        vec![status_json("1", "42", "alice"), status_json("2", "42", "alice")],
        Some("cursor-a"),
    ));
    remote.push_page(ScriptedPage::statuses(
        vec![status_json("3", "42", "alice")],
        None,
    ));
    let coordinator = FetchCoordinator::new(60_000);

    let first = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(1_000),
    );
    assert!(first.is_fetched());

    // Follow the returned cursor for the next page.
    let next = select_list_state(&state, EntityType::Status, &key("home"))
        .unwrap()
        .next
        .clone();
    assert!(next.is_some());
    let second = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts {
            force: true,
            cursor: next,
            position: InsertPosition::End,
            overwrite_state: true,
            ..FetchOpts::default()
        },
        WallClock(2_000),
    );
    assert!(second.is_fetched());

    let home = select_entities(&state, EntityType::Status, &key("home"));
    let ids: Vec<&str> = home.iter().map(|e| e.id().as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    // The scripted cursor round-tripped verbatim.
    assert_eq!(
        *remote.seen_cursors.borrow(),
        vec![None, Some("cursor-a".to_string())]
    );

    // Page two exhausted the list.
    let state_after = select_list_state(&state, EntityType::Status, &key("home")).unwrap();
    assert!(state_after.next.is_none());
}

#[test]
fn stale_window_gates_revalidation() {
    let mut state = fedicache::CacheState::new();
    let remote = ScriptedRemote::new();
    remote.push_page(ScriptedPage::statuses(vec![status_json("1", "42", "alice")], None));
    remote.push_page(ScriptedPage::statuses(vec![status_json("1", "42", "alice")], None));
    let coordinator = FetchCoordinator::new(10_000);

    coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(1_000),
    );

    // Inside the window: served from cache.
    let outcome = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(5_000),
    );
    assert!(matches!(outcome, FetchOutcome::SkippedFresh));
    assert_eq!(remote.list_calls(), 1);

    // Past the window: revalidated.
    let outcome = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(20_000),
    );
    assert!(outcome.is_fetched());
    assert_eq!(remote.list_calls(), 2);
}

#[test]
fn superseded_lookup_loses_to_the_newer_one() {
    let mut state = fedicache::CacheState::new();
    let remote = ScriptedRemote::new();
    remote.push_page(ScriptedPage::statuses(vec![status_json("1", "42", "alice")], None));
    remote.push_page(ScriptedPage::statuses(vec![status_json("2", "42", "alice")], None));
    let coordinator = FetchCoordinator::new(60_000);

    // First lookup is aborted before its response lands.
    let abort = AbortHandle::new();
    abort.abort();
    let outcome = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("search"),
        FetchOpts {
            abort: Some(abort),
            ..FetchOpts::default()
        },
        WallClock(1_000),
    );
    assert!(matches!(outcome, FetchOutcome::Aborted));
    assert!(select_entities(&state, EntityType::Status, &key("search")).is_empty());

    // The superseding lookup lands its own page.
    let outcome = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("search"),
        FetchOpts {
            force: true,
            ..FetchOpts::default()
        },
        WallClock(1_100),
    );
    assert!(outcome.is_fetched());
    let found = select_entities(&state, EntityType::Status, &key("search"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), &id("2"));
}

#[test]
fn rejection_surfaces_on_list_state_not_as_eviction() {
    let mut state = fedicache::CacheState::new();
    let remote = ScriptedRemote::new();
    remote.push_page(ScriptedPage::statuses(vec![status_json("1", "42", "alice")], None));
    remote.push_page_error(503);
    let coordinator = FetchCoordinator::new(0);

    coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(1_000),
    );
    let outcome = coordinator.fetch_list(
        &mut state,
        &remote,
        EntityType::Status,
        &key("home"),
        FetchOpts::default(),
        WallClock(2_000),
    );

    match outcome {
        FetchOutcome::Failed(err) => assert!(err.transience().is_retryable()),
        other => panic!("expected failure, got {other:?}"),
    }
    let list_state = select_list_state(&state, EntityType::Status, &key("home")).unwrap();
    assert!(list_state.error.is_some());
    // The stale page is still readable.
    assert_eq!(
        select_entities(&state, EntityType::Status, &key("home")).len(),
        1
    );
}
