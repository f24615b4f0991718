//! Capability contracts for the external collaborators.
//!
//! The engine consumes four narrow ports; drivers are injected at
//! construction and never swapped afterwards. Every method is a suspension
//! point.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::Vertex;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Symmetric cipher selector for vault encrypt/decrypt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionAlgo {
    ChaCha20Poly1305,
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("unknown vault key {0:?}")]
    UnknownKey(String),

    #[error("vault cipher failure: {0}")]
    Cipher(String),

    #[error("vault backend: {0}")]
    Backend(#[source] BoxError),
}

/// Key vault: signing and authenticated symmetric encryption.
///
/// Key references take the form `<nodeIdentity>/<vaultKeyId>`.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Sign raw bytes with the key addressed by `key_ref`.
    async fn sign(&self, key_ref: &str, data: &[u8]) -> Result<Vec<u8>, VaultError>;

    async fn encrypt(
        &self,
        key_ref: &str,
        algo: EncryptionAlgo,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, VaultError>;

    async fn decrypt(
        &self,
        key_ref: &str,
        algo: EncryptionAlgo,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, VaultError>;
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("identity backend: {0}")]
    Backend(#[source] BoxError),
}

/// An issued verifiable credential in JWS compact form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub jwt: String,
}

/// Result of checking a verifiable credential.
#[derive(Clone, Debug)]
pub struct CredentialCheck {
    pub revoked: bool,
    /// Decoded credential payload.
    pub credential: Value,
}

/// Identity provider issuing and checking verifiable credentials.
///
/// Assertion method references take the form
/// `<nodeIdentity>#<assertionMethodId>`.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn create_verifiable_credential(
        &self,
        issuer: &str,
        assertion_method: &str,
        subject_id: Option<&str>,
        credential_type: &str,
        subject: &Value,
    ) -> Result<IssuedCredential, IdentityError>;

    async fn check_verifiable_credential(
        &self,
        jwt: &str,
    ) -> Result<CredentialCheck, IdentityError>;
}

#[derive(Debug, Error)]
pub enum ImmutableLogError {
    #[error("immutable record not found: {0}")]
    NotFound(String),

    #[error("controller mismatch for {0}")]
    WrongController(String),

    #[error("immutable log backend: {0}")]
    Backend(#[source] BoxError),
}

/// Append-only tamper-evident store; ids are opaque URNs.
#[async_trait]
pub trait ImmutableLog: Send + Sync {
    async fn store(&self, controller: &str, bytes: &[u8]) -> Result<String, ImmutableLogError>;

    async fn get(&self, id: &str) -> Result<Vec<u8>, ImmutableLogError>;

    async fn remove(&self, controller: &str, id: &str) -> Result<(), ImmutableLogError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bad query cursor {0:?}")]
    BadCursor(String),

    #[error("store backend: {0}")]
    Backend(#[source] BoxError),
}

/// Secondary-index property an `Includes` condition matches against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexProperty {
    Id,
    AliasIndex,
}

/// Substring-containment predicate; conditions are OR-joined.
#[derive(Clone, Debug)]
pub struct Includes {
    pub property: IndexProperty,
    pub needle: String,
}

/// Sortable vertex property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortProperty {
    #[default]
    Created,
    Updated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Query sent to the vertex store.
#[derive(Clone, Debug, Default)]
pub struct StoreQuery {
    pub conditions: Vec<Includes>,
    pub sort: SortProperty,
    pub direction: SortDirection,
    /// Projection; `id` is always returned.
    pub properties: Option<Vec<String>>,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

/// One page of query results.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub entities: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    pub total_entities: usize,
}

/// Vertex persistence with `id` primary key and an `aliasIndex` secondary
/// index; `set` is the commit point of every mutation.
#[async_trait]
pub trait VertexStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Vertex>, StoreError>;

    async fn set(&self, vertex: Vertex) -> Result<(), StoreError>;

    async fn query(&self, query: StoreQuery) -> Result<QueryPage, StoreError>;
}
