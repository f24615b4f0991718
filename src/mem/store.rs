//! Vertex store over a BTreeMap with substring secondary-index queries.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::Vertex;
use crate::ports::{
    Includes, IndexProperty, QueryPage, SortDirection, SortProperty, StoreError, StoreQuery,
    VertexStore,
};

/// Page size when the query does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Default)]
pub struct MemVertexStore {
    vertices: RwLock<BTreeMap<String, Vertex>>,
}

impl MemVertexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vertices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VertexStore for MemVertexStore {
    async fn get(&self, id: &str) -> Result<Option<Vertex>, StoreError> {
        Ok(self
            .vertices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    async fn set(&self, vertex: Vertex) -> Result<(), StoreError> {
        self.vertices
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(vertex.id.to_hex(), vertex);
        Ok(())
    }

    async fn query(&self, query: StoreQuery) -> Result<QueryPage, StoreError> {
        let vertices = self.vertices.read().unwrap_or_else(|e| e.into_inner());
        let mut matches: Vec<&Vertex> = vertices
            .values()
            .filter(|vertex| matches_conditions(vertex, &query.conditions))
            .collect();
        matches.sort_by_key(|vertex| match query.sort {
            SortProperty::Created => vertex.created,
            SortProperty::Updated => vertex.updated,
        });
        if query.direction == SortDirection::Descending {
            matches.reverse();
        }

        let total_entities = matches.len();
        let offset = match query.cursor.as_deref() {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| StoreError::BadCursor(raw.to_string()))?,
            None => 0,
        };
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let entities: Vec<Value> = matches
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|vertex| project(vertex, query.properties.as_deref()))
            .collect::<Result<_, _>>()?;

        let consumed = offset + entities.len();
        let cursor = (consumed < total_entities).then(|| consumed.to_string());
        Ok(QueryPage {
            entities,
            cursor,
            page_size: Some(page_size),
            total_entities,
        })
    }
}

fn matches_conditions(vertex: &Vertex, conditions: &[Includes]) -> bool {
    if conditions.is_empty() {
        return true;
    }
    conditions.iter().any(|condition| match condition.property {
        IndexProperty::Id => vertex.id.to_hex().contains(&condition.needle),
        IndexProperty::AliasIndex => vertex
            .alias_index
            .as_deref()
            .is_some_and(|index| index.contains(&condition.needle)),
    })
}

fn project(vertex: &Vertex, properties: Option<&[String]>) -> Result<Value, StoreError> {
    let value = serde_json::to_value(vertex).map_err(|e| StoreError::Backend(Box::new(e)))?;
    let Some(properties) = properties else {
        return Ok(value);
    };
    let Value::Object(map) = value else {
        return Ok(value);
    };
    let mut projected = Map::new();
    for (key, entry) in map {
        if key == "id" || properties.iter().any(|property| *property == key) {
            projected.insert(key, entry);
        }
    }
    Ok(Value::Object(projected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Alias, EpochMs, NodeIdentity, VertexId};

    fn vertex(fill: u8, created: u64, aliases: &[&str]) -> Vertex {
        let mut vertex = Vertex::zero(
            VertexId::from_bytes([fill; 32]),
            NodeIdentity::parse("did:test:node").unwrap(),
            EpochMs(created),
        );
        if !aliases.is_empty() {
            vertex.aliases = Some(
                aliases
                    .iter()
                    .map(|id| Alias {
                        id: (*id).to_string(),
                        created: EpochMs(created),
                        updated: None,
                        deleted: None,
                        metadata_schema: None,
                        metadata: None,
                    })
                    .collect(),
            );
            vertex.rebuild_alias_index();
        }
        vertex
    }

    async fn seeded() -> MemVertexStore {
        let store = MemVertexStore::new();
        store.set(vertex(0x11, 100, &["foo123"])).await.unwrap();
        store.set(vertex(0x22, 200, &["bar456"])).await.unwrap();
        store.set(vertex(0x33, 300, &[])).await.unwrap();
        store
    }

    #[tokio::test]
    async fn get_returns_stored_vertex_by_hex_id() {
        let store = seeded().await;
        let found = store.get(&"11".repeat(32)).await.unwrap().unwrap();
        assert_eq!(found.created, EpochMs(100));
        assert!(store.get(&"99".repeat(32)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_conditions_match_everything() {
        let store = seeded().await;
        let page = store.query(StoreQuery::default()).await.unwrap();
        assert_eq!(page.total_entities, 3);
        assert_eq!(page.entities.len(), 3);
    }

    #[tokio::test]
    async fn conditions_are_or_joined_substring_matches() {
        let store = seeded().await;
        let page = store
            .query(StoreQuery {
                conditions: vec![
                    Includes {
                        property: IndexProperty::Id,
                        needle: "11".into(),
                    },
                    Includes {
                        property: IndexProperty::AliasIndex,
                        needle: "bar".into(),
                    },
                ],
                ..StoreQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_entities, 2);
    }

    #[tokio::test]
    async fn sorting_defaults_to_created_descending() {
        let store = seeded().await;
        let page = store.query(StoreQuery::default()).await.unwrap();
        let created: Vec<u64> = page
            .entities
            .iter()
            .map(|entity| entity["created"].as_u64().unwrap())
            .collect();
        assert_eq!(created, vec![300, 200, 100]);

        let ascending = store
            .query(StoreQuery {
                direction: SortDirection::Ascending,
                ..StoreQuery::default()
            })
            .await
            .unwrap();
        let created: Vec<u64> = ascending
            .entities
            .iter()
            .map(|entity| entity["created"].as_u64().unwrap())
            .collect();
        assert_eq!(created, vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn cursor_pages_through_results() {
        let store = seeded().await;
        let first = store
            .query(StoreQuery {
                page_size: Some(2),
                ..StoreQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(first.entities.len(), 2);
        assert_eq!(first.cursor.as_deref(), Some("2"));
        assert_eq!(first.total_entities, 3);

        let second = store
            .query(StoreQuery {
                page_size: Some(2),
                cursor: first.cursor,
                ..StoreQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second.entities.len(), 1);
        assert_eq!(second.cursor, None);
    }

    #[tokio::test]
    async fn bad_cursor_is_rejected() {
        let store = seeded().await;
        let err = store
            .query(StoreQuery {
                cursor: Some("not-a-number".into()),
                ..StoreQuery::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::BadCursor(_)));
    }

    #[tokio::test]
    async fn projection_keeps_id_and_requested_fields() {
        let store = seeded().await;
        let page = store
            .query(StoreQuery {
                properties: Some(vec!["aliasIndex".into()]),
                ..StoreQuery::default()
            })
            .await
            .unwrap();
        for entity in &page.entities {
            let object = entity.as_object().unwrap();
            assert!(object.contains_key("id"));
            assert!(!object.contains_key("created"));
            assert!(!object.contains_key("nodeIdentity"));
        }
        assert!(page.entities.iter().any(|entity| entity
            .get("aliasIndex")
            .is_some_and(|index| *index == "foo123")));
    }
}
