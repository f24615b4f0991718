//! Orchestration layer: reconcilers, integrity envelope, verifier, and the
//! vertex service.

mod envelope;
mod error;
mod reconcile;
mod verify;
mod vertex;

pub use envelope::{assertion_method_ref, vault_key_ref, CredentialSubject, CREDENTIAL_TYPE};
pub use error::{OpCause, OpError};
pub use verify::{ChangesetVerification, VerificationReport, VerifyDepth, VerifyFailure};
pub use vertex::{
    GetOptions, IdMode, QueryOptions, VertexMutation, VertexResult, VertexService,
};
