//! Write driver: applies the optimistic protocol around `RemoteClient::mutate`.
//!
//! The rejection from a failed write is always converted into a rollback
//! here; only the callbacks see the classified error.

use tracing::debug;

use super::error::ApiError;
use super::remote::{MutateAction, RemoteClient};
use crate::core::{ApplyOutcome, CacheState, OptimisticMutation, RawEntity, Reconcile};

/// View-layer callbacks for one mutation.
pub trait MutationCallbacks {
    fn on_success(&mut self, _response: Option<&RawEntity>) {}
    fn on_error(&mut self, _error: &ApiError) {}
}

/// No-op callbacks.
pub struct SilentCallbacks;

impl MutationCallbacks for SilentCallbacks {}

#[derive(Debug)]
pub enum MutateOutcome {
    Success(ApplyOutcome),
    Failed(ApiError),
}

impl MutateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Everything needed to issue one optimistic write.
pub struct MutationDescriptor<F>
where
    F: FnOnce(&mut CacheState) -> ApplyOutcome,
{
    pub action: MutateAction,
    /// Forward patch matching the expected server effect.
    pub patch: F,
    pub reconcile: Reconcile,
}

/// Apply the patch, issue the write, reconcile or roll back.
///
/// A second mutation for the same resource while one is pending is neither
/// queued nor coalesced: its patch is computed against the current
/// (already-optimistic) state.
pub fn mutate<F>(
    state: &mut CacheState,
    client: &dyn RemoteClient,
    descriptor: MutationDescriptor<F>,
    callbacks: &mut dyn MutationCallbacks,
) -> MutateOutcome
where
    F: FnOnce(&mut CacheState) -> ApplyOutcome,
{
    let MutationDescriptor {
        action,
        patch,
        reconcile,
    } = descriptor;

    let (mutation, mut outcome) = OptimisticMutation::begin(state, reconcile, patch);

    match client.mutate(&action) {
        Ok(response) => {
            outcome.merge(mutation.settle_success(state, response.as_ref()));
            callbacks.on_success(response.as_ref());
            MutateOutcome::Success(outcome)
        }
        Err(err) => {
            debug!(error = %err, "mutation rejected; rolling back");
            mutation.settle_failure(state);
            callbacks.on_error(&err);
            MutateOutcome::Failed(err)
        }
    }
}
