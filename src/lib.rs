//! Normalized entity cache for federated social clients.
//!
//! One flat ID-keyed store per entity type, named ordered lists over them,
//! and a paginated query cache, all mutated through a total verb set.
//! Writes apply optimistically with whole-state snapshot rollback; live
//! stream events reconcile through a single ordered dispatcher.

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod stream;
pub mod telemetry;

pub use config::{Config, ConfigError, FetchConfig, StreamConfig};
pub use error::{Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::client::{
    AbortHandle, ApiError, FetchCoordinator, FetchOpts, FetchOutcome, MutateAction, MutateOutcome,
    MutationCallbacks, MutationDescriptor, PageResponse, RemoteClient, mutate,
};
pub use crate::core::{
    ApplyOutcome, CacheOp, CacheState, Cursor, Entity, EntityId, EntityStore, EntityType, Handle,
    InsertPosition, ListKey, ListState, QueryCache, QueryKey, RawEntity, Reconcile, WallClock,
};
pub use crate::stream::{Dispatcher, StreamEffects, StreamEvent, decode_stream_event};
