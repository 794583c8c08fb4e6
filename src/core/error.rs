//! Core capability errors (parsing, validation).
//!
//! These are bounded and stable: core errors represent domain/refusal
//! states, not library implementation details. None of the cache verbs
//! themselves can fail; these errors only arise at construction edges
//! (ID parsing, payload decoding).

use thiserror::Error;

use crate::error::Transience;

/// Invalid identifier.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("entity id `{raw}` is invalid: {reason}")]
    Entity { raw: String, reason: String },
    #[error("list key `{raw}` is invalid: {reason}")]
    List { raw: String, reason: String },
    #[error("handle `{raw}` is invalid: {reason}")]
    Handle { raw: String, reason: String },
}

/// Top-level payload shape mismatch.
///
/// Individual malformed array elements are repaired or dropped by the
/// decoders; this error means the payload as a whole was unusable
/// (not an object, or missing its `id`).
#[derive(Debug, Error, Clone)]
#[error("{entity_type} payload is malformed: {reason}")]
pub struct MalformedPayload {
    pub entity_type: &'static str,
    pub reason: String,
}

/// Canonical error enum for the core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    MalformedPayload(#[from] MalformedPayload),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Bad IDs and bad shapes do not improve on retry.
        Transience::Permanent
    }
}
