//! Operation errors surfaced by the vertex service.

use thiserror::Error;

use crate::core::{CanonError, CoreError};
use crate::ports::{IdentityError, ImmutableLogError, StoreError, VaultError};

/// Underlying cause carried by an operation wrapper, wrapped exactly once.
#[derive(Debug, Error)]
pub enum OpCause {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Immutable(#[from] ImmutableLogError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Errors surfaced by vertex operations.
///
/// Verification diagnostics are not errors; they are reported per changeset
/// in the verification entries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OpError {
    #[error("vertex create failed")]
    CreateFailed(#[source] OpCause),

    #[error("vertex update failed")]
    UpdateFailed(#[source] OpCause),

    #[error("vertex get failed")]
    GetFailed(#[source] OpCause),

    #[error("vertex query failed")]
    QueryFailed(#[source] OpCause),

    #[error("immutable detach failed")]
    RemoveImmutableFailed(#[source] OpCause),

    #[error("vertex urn must use namespace {expected:?}, got {got:?}")]
    NamespaceMismatch { expected: &'static str, got: String },

    #[error("vertex not found: {0}")]
    NotFound(String),

    #[error("guard violation: {0}")]
    GuardViolation(&'static str),
}
