//! Vertex sub-elements: aliases, resources, and typed edges.
//!
//! Sub-elements are never physically removed. Deletion stamps `deleted` and
//! the tombstone is retained forever; a tombstoned id may later be re-created
//! as a new element with a fresh `created` epoch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::time::EpochMs;

/// Alternative lookup name for a vertex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    pub id: String,
    pub created: EpochMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Alias {
    pub fn is_active(&self) -> bool {
        self.deleted.is_none()
    }
}

/// External resource attached to a vertex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub created: EpochMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Resource {
    pub fn is_active(&self) -> bool {
        self.deleted.is_none()
    }
}

/// Typed relationship from this vertex to another element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub relationship: String,
    pub created: EpochMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Edge {
    pub fn is_active(&self) -> bool {
        self.deleted.is_none()
    }
}

/// Requested state for one alias in an update list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasUpdate {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl AliasUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Requested state for one resource in an update list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdate {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ResourceUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Requested state for one edge in an update list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeUpdate {
    pub id: String,
    pub relationship: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl EdgeUpdate {
    pub fn new(id: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            relationship: relationship.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let alias = Alias {
            id: "foo123".into(),
            created: EpochMs(10),
            updated: None,
            deleted: None,
            metadata_schema: None,
            metadata: None,
        };
        assert_eq!(
            serde_json::to_value(&alias).unwrap(),
            json!({"id": "foo123", "created": 10})
        );
    }

    #[test]
    fn fields_serialize_camel_case() {
        let edge = Edge {
            id: "e1".into(),
            relationship: "references".into(),
            created: EpochMs(1),
            updated: None,
            deleted: Some(EpochMs(2)),
            metadata_schema: Some("schema-a".into()),
            metadata: Some(json!({"k": "v"})),
        };
        assert_eq!(
            serde_json::to_value(&edge).unwrap(),
            json!({
                "id": "e1",
                "relationship": "references",
                "created": 1,
                "deleted": 2,
                "metadataSchema": "schema-a",
                "metadata": {"k": "v"}
            })
        );
        assert!(!edge.is_active());
    }
}
