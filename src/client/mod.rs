//! Remote API surface: the client trait, error taxonomy, and the
//! fetch/mutate coordinators driving the cache lifecycle.

pub mod error;
pub mod fetch;
pub mod mutate;
pub mod remote;

pub use error::ApiError;
pub use fetch::{FetchCoordinator, FetchOpts, FetchOutcome};
pub use mutate::{
    MutateOutcome, MutationCallbacks, MutationDescriptor, SilentCallbacks, mutate,
};
pub use remote::{AbortHandle, MutateAction, PageResponse, RemoteClient};
