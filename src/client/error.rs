//! Remote API error taxonomy.
//!
//! Transport: network failure, no usable response - stale data retained.
//! Validation: top-level response shape mismatch - propagates like transport.
//! Rejected: the server refused a request (mutation conflict, auth).

use thiserror::Error;

use crate::core::MalformedPayload;
use crate::error::Transience;

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ApiError {
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    #[error(transparent)]
    Validation(#[from] MalformedPayload),

    #[error("request rejected with status {status}")]
    Rejected { status: u16 },
}

impl ApiError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn rejected(status: u16) -> Self {
        Self::Rejected { status }
    }

    /// HTTP status when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    pub fn transience(&self) -> Transience {
        match self {
            Self::Transport { .. } => Transience::Retryable,
            Self::Validation(_) => Transience::Permanent,
            Self::Rejected { status } => {
                if *status == 429 || *status >= 500 {
                    Transience::Retryable
                } else {
                    Transience::Permanent
                }
            }
        }
    }
}
