//! The remote API collaborator and cooperative cancellation.
//!
//! The core never speaks a transport protocol; it consumes this trait.
//! Implementations return typed entities or reject with an `ApiError`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::core::{Cursor, EntityId, EntityType, ListKey, RawEntity};

/// One page of a list endpoint's response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageResponse {
    pub items: Vec<RawEntity>,
    pub next: Option<Cursor>,
    pub prev: Option<Cursor>,
    /// Some servers expose the full count as a header.
    pub total_count: Option<u64>,
}

/// Write actions the core can issue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MutateAction {
    CreateStatus {
        content: String,
    },
    Favourite {
        status_id: EntityId,
    },
    Unfavourite {
        status_id: EntityId,
    },
    React {
        status_id: EntityId,
        name: String,
    },
    Unreact {
        status_id: EntityId,
        name: String,
    },
    Follow {
        account_id: EntityId,
    },
    Unfollow {
        account_id: EntityId,
    },
    SendChatMessage {
        chat_id: EntityId,
        content: String,
    },
    ReactAnnouncement {
        announcement_id: EntityId,
        name: String,
    },
    UnreactAnnouncement {
        announcement_id: EntityId,
        name: String,
    },
    DismissNotification {
        notification_id: EntityId,
    },
    SaveMarker {
        timeline: String,
        last_read_id: EntityId,
    },
}

/// The opaque remote API client.
///
/// Calls are issued from the single-threaded core loop; implementations
/// suspend only the calling logical task.
pub trait RemoteClient {
    fn fetch_entity(&self, typ: EntityType, id: &EntityId) -> Result<RawEntity, ApiError>;

    fn fetch_list(
        &self,
        typ: EntityType,
        list: &ListKey,
        cursor: Option<&Cursor>,
    ) -> Result<PageResponse, ApiError>;

    fn mutate(&self, action: &MutateAction) -> Result<Option<RawEntity>, ApiError>;
}

/// Cooperative cancellation for one logical lookup.
///
/// Aborting does not interrupt the transport call; it marks the lookup so
/// its response is discarded instead of imported (last-issued-wins, not
/// last-resolved-wins).
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }
}
