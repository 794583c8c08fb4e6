//! Fetch lifecycle driver.
//!
//! Enforces the one-in-flight-per-(type, list) guarantee by reading
//! `fetching` before issuing a request; a caller racing that check can
//! still double-fetch, which is tolerated because imports are idempotent
//! by ID. Rejections never propagate past this layer for list fetches -
//! they become `FetchFail` transitions and stale data stays visible.

use tracing::debug;

use super::error::ApiError;
use super::remote::{AbortHandle, PageResponse, RemoteClient};
use crate::core::{
    ApplyOutcome, CacheOp, CacheState, Cursor, EntityId, EntityType, InsertPosition, ListKey,
    ListState, WallClock, normalize, normalize_all, normalize_shallow,
};

/// Per-call options.
#[derive(Clone, Debug, Default)]
pub struct FetchOpts {
    /// Refetch even when the list is fresh.
    pub force: bool,
    /// Continue from this cursor instead of the list head.
    pub cursor: Option<Cursor>,
    /// Where fetched IDs are inserted.
    pub position: InsertPosition,
    /// Replace the list state wholesale instead of merging cursors.
    pub overwrite_state: bool,
    /// Cooperative cancellation for this lookup.
    pub abort: Option<AbortHandle>,
}

/// What a fetch call did.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(ApplyOutcome),
    /// Another fetch for the same list is in flight.
    SkippedInFlight,
    /// The list is fetched, valid, and inside the stale window.
    SkippedFresh,
    /// The lookup was aborted; the response was discarded.
    Aborted,
    Failed(ApiError),
}

impl FetchOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

/// Drives list and entity fetches against a `RemoteClient`.
#[derive(Clone, Copy, Debug)]
pub struct FetchCoordinator {
    stale_window_ms: u64,
}

impl FetchCoordinator {
    pub fn new(stale_window_ms: u64) -> Self {
        Self { stale_window_ms }
    }

    /// Fetch one page of a list and land it in the cache.
    pub fn fetch_list(
        &self,
        state: &mut CacheState,
        client: &dyn RemoteClient,
        typ: EntityType,
        list: &ListKey,
        opts: FetchOpts,
        now: WallClock,
    ) -> FetchOutcome {
        if let Some(entry) = state.store(typ).list(list) {
            if entry.state.fetching {
                debug!(typ = typ.as_str(), list = %list, "fetch suppressed: in flight");
                return FetchOutcome::SkippedInFlight;
            }
            if !opts.force && self.is_fresh(&entry.state, now) {
                return FetchOutcome::SkippedFresh;
            }
        }

        state.apply(CacheOp::FetchRequest { typ, list: list.clone() });

        let result = client.fetch_list(typ, list, opts.cursor.as_ref());

        if opts.abort.as_ref().is_some_and(AbortHandle::is_aborted) {
            // A newer lookup superseded this one; discard whatever came back.
            debug!(typ = typ.as_str(), list = %list, "fetch aborted; response discarded");
            state.apply(CacheOp::FetchFail {
                typ,
                list: list.clone(),
                error: "aborted".into(),
            });
            return FetchOutcome::Aborted;
        }

        match result {
            Ok(page) => {
                FetchOutcome::Fetched(self.land_page(state, typ, list, page, &opts, now))
            }
            Err(err) => {
                state.apply(CacheOp::FetchFail {
                    typ,
                    list: list.clone(),
                    error: err.to_string(),
                });
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Fetch a single entity. Shallow import when its children are
    /// known-fresh. Rejections propagate: there is no list state to
    /// record them on.
    pub fn fetch_entity(
        &self,
        state: &mut CacheState,
        client: &dyn RemoteClient,
        typ: EntityType,
        id: &EntityId,
        shallow: bool,
        abort: Option<&AbortHandle>,
    ) -> Result<ApplyOutcome, ApiError> {
        let raw = client.fetch_entity(typ, id)?;
        if abort.is_some_and(|handle| handle.is_aborted()) {
            debug!(typ = typ.as_str(), id = %id, "entity fetch aborted; response discarded");
            return Ok(ApplyOutcome::default());
        }
        let buckets = if shallow {
            normalize_shallow(&raw)
        } else {
            normalize(&raw)
        };
        Ok(state.apply_batch(buckets.into_ops(None)))
    }

    fn is_fresh(&self, list_state: &ListState, now: WallClock) -> bool {
        if !list_state.fetched || list_state.invalid {
            return false;
        }
        match list_state.last_fetched_at {
            Some(at) => now <= at.saturating_add_ms(self.stale_window_ms),
            None => false,
        }
    }

    fn land_page(
        &self,
        state: &mut CacheState,
        typ: EntityType,
        list: &ListKey,
        page: PageResponse,
        opts: &FetchOpts,
        now: WallClock,
    ) -> ApplyOutcome {
        let mut buckets = normalize_all(page.items.iter());
        // Only the page's top-level objects join the list, in response
        // order; embedded same-type children (reblogs, quotes) import
        // without membership. Cross-type entities (e.g. authors) land in
        // the same batch so one response updates every affected store.
        let own = buckets.take_roots(typ);
        let mut ops = buckets.into_ops(None);
        ops.push(CacheOp::FetchSuccess {
            typ,
            list: list.clone(),
            entities: own,
            position: opts.position,
            state: ListState {
                fetching: false,
                fetched: true,
                invalid: false,
                error: None,
                last_fetched_at: Some(now),
                next: page.next,
                prev: page.prev,
                total_count: page.total_count,
            },
            overwrite: opts.overwrite_state,
        });
        state.apply_batch(ops)
    }
}
