//! Store adapters: one short-lived logical operation per call, no explicit
//! transactions, no retries. Failures are reported once and never retried.

pub mod memory;
pub mod neo4j;

use async_trait::async_trait;
use thiserror::Error;

use crate::graph_utils::graph::{EdgeDirection, GraphEdge, GraphNode, GraphSnapshot, PropertyMap};

/// Default structural label when a node label is empty after sanitization.
pub const DEFAULT_NODE_LABEL: &str = "Node";
/// Default relationship type when the typed-in value sanitizes to nothing.
pub const DEFAULT_REL_TYPE: &str = "REL";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("result mapping error: {0}")]
    Mapping(String),
}

/// The query surface this client needs from a property-graph store.
///
/// Updating an entity that no longer exists is deliberately NOT an error:
/// the store reports zero affected records, the adapter logs it and returns
/// `Ok(())`. See DESIGN.md for the rationale.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Fetch all nodes, then all directed relationships with their endpoints.
    /// Two separate reads with no snapshot isolation between them; a write
    /// landing in the gap can yield an edge whose endpoint is missing from
    /// the node list. Accepted inconsistency window.
    async fn get_graph(&self) -> Result<GraphSnapshot, StoreError>;

    /// Create a node with a freshly generated uuid merged into `properties`.
    async fn add_node(&self, label: &str, properties: PropertyMap)
        -> Result<GraphNode, StoreError>;

    /// Create a directed relationship. When `direction` is `Reverse` the
    /// endpoints are swapped before the write so the stored edge always
    /// points in the intended direction; `Both` is a rendering hint only.
    async fn add_relationship(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        direction: EdgeDirection,
        properties: PropertyMap,
    ) -> Result<GraphEdge, StoreError>;

    /// Merge (never replace) properties onto the node matched by uuid.
    async fn update_node_properties(&self, id: &str, properties: PropertyMap)
        -> Result<(), StoreError>;

    /// Merge (never replace) properties onto the relationship matched by uuid.
    async fn update_relationship_properties(
        &self,
        id: &str,
        properties: PropertyMap,
    ) -> Result<(), StoreError>;

    /// Distinct non-null values of the type-tag property across all nodes,
    /// sorted; feeds the filter selector.
    async fn list_type_tags(&self) -> Result<Vec<String>, StoreError>;
}
