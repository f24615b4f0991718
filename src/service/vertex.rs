//! Vertex service: mutation, retrieval, verification entry points.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::core::{
    chain_digest, diff, to_canon_json_bytes, Alias, AliasUpdate, Changeset, ChangesetDigest,
    Clock, CoreError, Edge, EdgeUpdate, EpochMs, IdSource, InvalidId, NodeIdentity, PatchOp,
    RandomIdSource, Resource, ResourceUpdate, SystemClock, UserIdentity, Vertex, VertexId,
    URN_NAMESPACE,
};
use crate::ports::{
    Identity, ImmutableLog, Includes, IndexProperty, QueryPage, SortDirection, SortProperty,
    StoreQuery, Vault, VertexStore,
};

use super::envelope;
use super::error::{OpCause, OpError};
use super::reconcile::reconcile;
use super::verify::{verify_vertex, ChangesetVerification, VerifyDepth};

/// Content of a vertex mutation.
///
/// `metadata_schema` and `metadata` always overwrite the vertex; for the
/// collections an absent list means "do not touch" and an empty list
/// tombstones every element.
#[derive(Clone, Debug, Default)]
pub struct VertexMutation {
    pub metadata_schema: Option<String>,
    pub metadata: Option<Value>,
    pub aliases: Option<Vec<AliasUpdate>>,
    pub resources: Option<Vec<ResourceUpdate>>,
    pub edges: Option<Vec<EdgeUpdate>>,
}

/// Options for `get`.
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    pub include_deleted: bool,
    pub include_changesets: bool,
    pub verify_signature_depth: VerifyDepth,
}

/// Result of `get`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexResult {
    pub vertex: Vertex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Vec<ChangesetVerification>>,
}

/// Needle interpretation for `query`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdMode {
    Id,
    Alias,
    #[default]
    Both,
}

/// Options for `query`.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    pub id: Option<String>,
    pub id_mode: IdMode,
    pub order_by: SortProperty,
    pub order_by_direction: SortDirection,
    pub properties: Option<Vec<String>>,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

/// The mutation, change-tracking, and verification engine.
///
/// Designed for a single writer per vertex; every mutation runs read,
/// reconcile, diff, sign, append, persist in order, and the final store
/// `set` is the commit point.
pub struct VertexService {
    store: Arc<dyn VertexStore>,
    vault: Arc<dyn Vault>,
    identity: Arc<dyn Identity>,
    immutable: Arc<dyn ImmutableLog>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    config: ServiceConfig,
}

impl VertexService {
    pub fn new(
        store: Arc<dyn VertexStore>,
        vault: Arc<dyn Vault>,
        identity: Arc<dyn Identity>,
        immutable: Arc<dyn ImmutableLog>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            vault,
            identity,
            immutable,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdSource),
            config,
        }
    }

    /// Replace the wall clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the id source (tests).
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Create a vertex and its first changeset; returns the `aig:` URN.
    ///
    /// The first changeset is written even when it carries no patches, so
    /// the initial signature is anchored.
    pub async fn create(
        &self,
        mutation: VertexMutation,
        user_identity: &str,
        node_identity: &str,
    ) -> Result<String, OpError> {
        let user = parse_user(user_identity)?;
        let node = parse_node(node_identity)?;
        let now = EpochMs(self.clock.now_ms());
        let id = self.ids.next_vertex_id();

        let mut vertex = Vertex::zero(id, node, now);
        let previous = vertex
            .diff_snapshot()
            .map_err(|e| OpError::CreateFailed(e.into()))?;
        apply_mutation(&mut vertex, &mutation, now)
            .map_err(|e| mutation_error(OpError::CreateFailed, e))?;
        let next = vertex
            .diff_snapshot()
            .map_err(|e| OpError::CreateFailed(e.into()))?;
        let patches = diff(&previous, &next);

        self.append_changeset(&mut vertex, patches, now, &user)
            .await
            .map_err(OpError::CreateFailed)?;
        self.store
            .set(vertex)
            .await
            .map_err(|e| OpError::CreateFailed(e.into()))?;
        debug!(vertex = %id, "vertex created");
        Ok(id.to_urn())
    }

    /// Retrieve a vertex, optionally verifying its chain.
    pub async fn get(&self, id: &str, options: GetOptions) -> Result<VertexResult, OpError> {
        let vertex_id = parse_urn(id)?;
        let mut vertex = self
            .store
            .get(&vertex_id.to_hex())
            .await
            .map_err(|e| OpError::GetFailed(e.into()))?
            .ok_or_else(|| OpError::NotFound(id.to_string()))?;

        let (verified, verification) = match options.verify_signature_depth {
            VerifyDepth::None => (None, None),
            depth => {
                let report = verify_vertex(
                    &self.vault,
                    &self.identity,
                    &self.immutable,
                    &self.config,
                    &vertex,
                    depth,
                )
                .await
                .map_err(OpError::GetFailed)?;
                (Some(report.verified), Some(report.changesets))
            }
        };

        if !options.include_deleted {
            vertex.strip_deleted();
        }
        if !options.include_changesets {
            vertex.changesets = None;
        }
        Ok(VertexResult {
            vertex,
            verified,
            verification,
        })
    }

    /// Apply a mutation to an existing vertex.
    ///
    /// When the diff is empty and a changeset already exists nothing is
    /// persisted, so semantically-identical updates are idempotent.
    pub async fn update(
        &self,
        id: &str,
        mutation: VertexMutation,
        user_identity: &str,
        node_identity: &str,
    ) -> Result<(), OpError> {
        let user = parse_user(user_identity)?;
        parse_node(node_identity)?;
        let vertex_id = parse_urn(id)?;
        let mut vertex = self
            .store
            .get(&vertex_id.to_hex())
            .await
            .map_err(|e| OpError::UpdateFailed(e.into()))?
            .ok_or_else(|| OpError::NotFound(id.to_string()))?;

        let now = EpochMs(self.clock.now_ms());
        let previous = vertex
            .diff_snapshot()
            .map_err(|e| OpError::UpdateFailed(e.into()))?;
        apply_mutation(&mut vertex, &mutation, now)
            .map_err(|e| mutation_error(OpError::UpdateFailed, e))?;
        let next = vertex
            .diff_snapshot()
            .map_err(|e| OpError::UpdateFailed(e.into()))?;
        let patches = diff(&previous, &next);

        if patches.is_empty() && vertex.has_changesets() {
            debug!(vertex = %vertex_id, "update produced no changes");
            return Ok(());
        }

        self.append_changeset(&mut vertex, patches, now, &user)
            .await
            .map_err(OpError::UpdateFailed)?;
        vertex.updated = now;
        self.store
            .set(vertex)
            .await
            .map_err(|e| OpError::UpdateFailed(e.into()))?;
        debug!(vertex = %vertex_id, "vertex updated");
        Ok(())
    }

    /// Detach every changeset from the immutable log.
    ///
    /// Local hash verification remains possible afterwards; signature
    /// verification via the envelope becomes unavailable.
    pub async fn remove_immutable(&self, id: &str, node_identity: &str) -> Result<(), OpError> {
        let node = parse_node(node_identity)?;
        let vertex_id = parse_urn(id)?;
        let mut vertex = self
            .store
            .get(&vertex_id.to_hex())
            .await
            .map_err(|e| OpError::RemoveImmutableFailed(e.into()))?
            .ok_or_else(|| OpError::NotFound(id.to_string()))?;

        let mut detached = 0usize;
        if let Some(changesets) = vertex.changesets.as_mut() {
            for changeset in changesets.iter_mut() {
                if let Some(storage_id) = changeset.immutable_storage_id.take() {
                    self.immutable
                        .remove(node.as_str(), &storage_id)
                        .await
                        .map_err(|e| OpError::RemoveImmutableFailed(e.into()))?;
                    detached += 1;
                }
            }
        }
        self.store
            .set(vertex)
            .await
            .map_err(|e| OpError::RemoveImmutableFailed(e.into()))?;
        debug!(vertex = %vertex_id, detached, "immutable storage detached");
        Ok(())
    }

    /// Query vertices by id and/or alias needle.
    pub async fn query(&self, options: QueryOptions) -> Result<QueryPage, OpError> {
        let mut conditions = Vec::new();
        if let Some(raw) = options.id.as_deref() {
            let needle = raw
                .strip_prefix(&format!("{}:", URN_NAMESPACE))
                .unwrap_or(raw);
            if matches!(options.id_mode, IdMode::Id | IdMode::Both) {
                conditions.push(Includes {
                    property: IndexProperty::Id,
                    needle: needle.to_string(),
                });
            }
            if matches!(options.id_mode, IdMode::Alias | IdMode::Both) {
                // The alias index is lowercased, so the needle is too.
                conditions.push(Includes {
                    property: IndexProperty::AliasIndex,
                    needle: needle.to_lowercase(),
                });
            }
        }
        self.store
            .query(StoreQuery {
                conditions,
                sort: options.order_by,
                direction: options.order_by_direction,
                properties: options.properties,
                cursor: options.cursor,
                page_size: options.page_size,
            })
            .await
            .map_err(|e| OpError::QueryFailed(e.into()))
    }

    async fn append_changeset(
        &self,
        vertex: &mut Vertex,
        patches: Vec<PatchOp>,
        now: EpochMs,
        user: &UserIdentity,
    ) -> Result<(), OpCause> {
        let canonical = to_canon_json_bytes(&patches)?;
        let previous = vertex.last_changeset().map(|c| *c.hash.as_bytes());
        let digest = chain_digest(previous.as_ref(), now, user.as_str(), &canonical);
        let node = vertex.node_identity.clone();
        let storage_id = envelope::anchor(
            &self.vault,
            &self.identity,
            &self.immutable,
            &self.config,
            &node,
            &digest,
            now,
            user,
            &patches,
        )
        .await?;
        vertex.push_changeset(Changeset {
            created: now,
            user_identity: user.clone(),
            patches,
            hash: ChangesetDigest::new(digest),
            immutable_storage_id: Some(storage_id),
        });
        Ok(())
    }
}

fn apply_mutation(
    vertex: &mut Vertex,
    mutation: &VertexMutation,
    now: EpochMs,
) -> Result<(), CoreError> {
    vertex.metadata_schema = mutation.metadata_schema.clone();
    vertex.metadata = mutation.metadata.clone();
    reconcile::<Alias>(&mut vertex.aliases, mutation.aliases.as_deref(), now)?;
    reconcile::<Resource>(&mut vertex.resources, mutation.resources.as_deref(), now)?;
    reconcile::<Edge>(&mut vertex.edges, mutation.edges.as_deref(), now)?;
    vertex.rebuild_alias_index();
    Ok(())
}

// Element guards inside a mutation surface as guard violations, not as
// wrapped operation failures.
fn mutation_error(wrap: fn(OpCause) -> OpError, error: CoreError) -> OpError {
    match error {
        CoreError::InvalidId(InvalidId::EmptyElementId) => {
            OpError::GuardViolation("element id must be a non-empty string")
        }
        CoreError::InvalidId(InvalidId::EmptyRelationship) => {
            OpError::GuardViolation("edge relationship must be a non-empty string")
        }
        other => wrap(other.into()),
    }
}

fn parse_user(raw: &str) -> Result<UserIdentity, OpError> {
    UserIdentity::parse(raw)
        .map_err(|_| OpError::GuardViolation("userIdentity must be a non-empty string"))
}

fn parse_node(raw: &str) -> Result<NodeIdentity, OpError> {
    NodeIdentity::parse(raw)
        .map_err(|_| OpError::GuardViolation("nodeIdentity must be a non-empty string"))
}

fn parse_urn(raw: &str) -> Result<VertexId, OpError> {
    VertexId::from_urn(raw).map_err(|e| match e {
        CoreError::InvalidId(InvalidId::Namespace { got, .. }) => OpError::NamespaceMismatch {
            expected: URN_NAMESPACE,
            got,
        },
        _ => OpError::GuardViolation("vertex id must be a valid aig urn"),
    })
}
