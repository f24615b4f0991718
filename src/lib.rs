#![forbid(unsafe_code)]

//! Auditable item graph engine.
//!
//! Vertices carry metadata, aliases, resources, and typed edges. Every
//! mutation is captured as a hash-chained, signed changeset anchored in an
//! external immutable log, so the full history of a vertex can be replayed
//! and cryptographically verified later.

pub mod config;
pub mod core;
pub mod error;
pub mod mem;
pub mod ports;
pub mod service;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the working set at crate root for convenience.
pub use crate::config::ServiceConfig;
pub use crate::core::{
    apply_patches, chain_digest, diff, to_canon_json_bytes, Alias, AliasUpdate, CanonError,
    Changeset, ChangesetDigest, Clock, CoreError, Edge, EdgeUpdate, EpochMs, IdSource,
    NodeIdentity, PatchOp, RandomIdSource, Resource, ResourceUpdate, SystemClock, UserIdentity,
    Vertex, VertexId,
};
pub use crate::service::{
    ChangesetVerification, GetOptions, IdMode, OpError, QueryOptions, VerifyDepth, VerifyFailure,
    VertexMutation, VertexResult, VertexService,
};
