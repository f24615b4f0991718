//! The vertex: root entity of the item graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::changeset::Changeset;
use super::element::{Alias, Edge, Resource};
use super::identity::{NodeIdentity, VertexId};
use super::json_canon::CanonError;
use super::time::EpochMs;

/// A graph node owned by a single controlling node identity.
///
/// Collections are `None` when absent; their order is insertion order and is
/// stable across updates. `changesets` is append-only, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub id: VertexId,
    pub node_identity: NodeIdentity,
    pub created: EpochMs,
    pub updated: EpochMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<Alias>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<Edge>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changesets: Option<Vec<Changeset>>,
}

impl Vertex {
    /// The zero-value vertex: the baseline the first changeset is diffed
    /// against. Carries only `id`, `nodeIdentity`, `created`, `updated`.
    pub fn zero(id: VertexId, node_identity: NodeIdentity, now: EpochMs) -> Self {
        Self {
            id,
            node_identity,
            created: now,
            updated: now,
            metadata_schema: None,
            metadata: None,
            alias_index: None,
            aliases: None,
            resources: None,
            edges: None,
            changesets: None,
        }
    }

    /// Rebuild the alias secondary index.
    ///
    /// The index covers live and tombstoned aliases: it serves lookup, not
    /// visibility. Ids are lowercased and joined with `||` in insertion
    /// order; the index is absent when the vertex has no aliases.
    pub fn rebuild_alias_index(&mut self) {
        self.alias_index = self
            .aliases
            .as_ref()
            .filter(|aliases| !aliases.is_empty())
            .map(|aliases| {
                aliases
                    .iter()
                    .map(|alias| alias.id.to_lowercase())
                    .collect::<Vec<_>>()
                    .join("||")
            });
    }

    /// Snapshot used for changeset diffing.
    ///
    /// Strips `changesets` plus the derived `aliasIndex` and maintained
    /// `updated` fields, so patches describe only caller-visible content.
    pub fn diff_snapshot(&self) -> Result<Value, CanonError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("changesets");
            map.remove("aliasIndex");
            map.remove("updated");
        }
        Ok(value)
    }

    /// Drop tombstoned sub-elements; collections left empty are removed.
    pub fn strip_deleted(&mut self) {
        fn keep_active<T>(collection: &mut Option<Vec<T>>, is_active: impl Fn(&T) -> bool) {
            if let Some(list) = collection {
                list.retain(|element| is_active(element));
                if list.is_empty() {
                    *collection = None;
                }
            }
        }
        keep_active(&mut self.aliases, Alias::is_active);
        keep_active(&mut self.resources, Resource::is_active);
        keep_active(&mut self.edges, Edge::is_active);
    }

    pub fn last_changeset(&self) -> Option<&Changeset> {
        self.changesets.as_ref().and_then(|changesets| changesets.last())
    }

    pub fn has_changesets(&self) -> bool {
        self.changesets
            .as_ref()
            .is_some_and(|changesets| !changesets.is_empty())
    }

    pub fn push_changeset(&mut self, changeset: Changeset) {
        self.changesets
            .get_or_insert_with(Vec::new)
            .push(changeset);
    }
}
