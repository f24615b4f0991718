//! Core error types.

use thiserror::Error;

use super::chain::InvalidDigest;
use super::json_canon::CanonError;
use super::patch::PatchError;

/// Canonical capability error for the pure domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Digest(#[from] InvalidDigest),
}

/// Identifier validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidId {
    #[error("vertex urn {raw:?} must use namespace {expected:?}, got {got:?}")]
    Namespace {
        raw: String,
        expected: &'static str,
        got: String,
    },

    #[error("invalid vertex id {raw:?}: {reason}")]
    Vertex { raw: String, reason: String },

    #[error("identity must be non-empty")]
    EmptyIdentity,

    #[error("element id must be non-empty")]
    EmptyElementId,

    #[error("edge relationship must be non-empty")]
    EmptyRelationship,
}
