//! Crate-level convenience error.

use thiserror::Error;

use crate::core::CoreError;
use crate::service::OpError;

/// Thin wrapper over the canonical capability errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Op(#[from] OpError),
}
