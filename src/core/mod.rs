//! Pure domain layer: identifiers, time, canonical JSON, diffing, the hash
//! chain, and the vertex data model.

mod chain;
mod changeset;
mod diff;
mod element;
mod error;
mod identity;
mod json_canon;
mod patch;
mod time;
mod vertex;

pub use chain::{chain_digest, ChangesetDigest, InvalidDigest, DIGEST_LEN};
pub use changeset::Changeset;
pub use diff::diff;
pub use element::{Alias, AliasUpdate, Edge, EdgeUpdate, Resource, ResourceUpdate};
pub use error::{CoreError, InvalidId};
pub use identity::{
    IdSource, NodeIdentity, RandomIdSource, UserIdentity, VertexId, URN_NAMESPACE, VERTEX_ID_LEN,
};
pub use json_canon::{canon_eq, to_canon_json_bytes, CanonError};
pub use patch::{apply_patches, PatchError, PatchOp};
pub use time::{Clock, EpochMs, SystemClock};
pub use vertex::Vertex;
