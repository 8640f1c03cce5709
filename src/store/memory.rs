use std::collections::BTreeSet;
use std::sync::Mutex;

use log::warn;
use uuid::Uuid;

use super::{GraphStore, StoreError, DEFAULT_NODE_LABEL, DEFAULT_REL_TYPE};
use crate::graph_utils::graph::{
    sanitize_identifier, EdgeDirection, GraphEdge, GraphNode, GraphSnapshot, PropertyMap,
    TYPE_TAG_KEY, UUID_KEY,
};

/// In-process store behind the same trait as the Neo4j adapter. Backs the test
/// suite and keeps the app usable when the database is unreachable. The store
/// contract is mirrored exactly: uuid stamping, endpoint swap on `"<-"`,
/// merge-not-replace updates, silent no-op on missing entities.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn get_graph(&self) -> Result<GraphSnapshot, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(GraphSnapshot::new(inner.nodes.clone(), inner.edges.clone()))
    }

    async fn add_node(
        &self,
        label: &str,
        mut properties: PropertyMap,
    ) -> Result<GraphNode, StoreError> {
        let node_uuid = Uuid::now_v7().to_string();
        properties.insert(UUID_KEY.to_string(), node_uuid.clone());
        let node = GraphNode {
            id: node_uuid,
            label: sanitize_identifier(label, DEFAULT_NODE_LABEL),
            properties,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.push(node.clone());
        Ok(node)
    }

    async fn add_relationship(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        direction: EdgeDirection,
        mut properties: PropertyMap,
    ) -> Result<GraphEdge, StoreError> {
        let rel_uuid = Uuid::now_v7().to_string();
        properties.insert(UUID_KEY.to_string(), rel_uuid.clone());
        let (from_id, to_id) = match direction {
            EdgeDirection::Reverse => (to_id, from_id),
            _ => (from_id, to_id),
        };
        let mut inner = self.inner.lock().unwrap();
        for endpoint in [from_id, to_id] {
            if !inner.nodes.iter().any(|n| n.id == endpoint) {
                return Err(StoreError::Query(format!(
                    "relationship create matched no endpoints ({} -> {})",
                    from_id, to_id
                )));
            }
        }
        let edge = GraphEdge {
            id: rel_uuid,
            from: from_id.to_string(),
            to: to_id.to_string(),
            rel_type: sanitize_identifier(rel_type, DEFAULT_REL_TYPE),
            properties,
            direction: EdgeDirection::Forward,
        };
        inner.edges.push(edge.clone());
        Ok(edge)
    }

    async fn update_node_properties(
        &self,
        id: &str,
        properties: PropertyMap,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => node.properties.extend(properties),
            None => warn!("update matched no node with uuid {}", id),
        }
        Ok(())
    }

    async fn update_relationship_properties(
        &self,
        id: &str,
        properties: PropertyMap,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => edge.properties.extend(properties),
            None => warn!("update matched no relationship with uuid {}", id),
        }
        Ok(())
    }

    async fn list_type_tags(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let tags: BTreeSet<String> = inner
            .nodes
            .iter()
            .filter_map(|n| n.properties.get(TYPE_TAG_KEY))
            .cloned()
            .collect();
        Ok(tags.into_iter().collect())
    }
}
