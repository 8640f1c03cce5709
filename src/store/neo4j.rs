use log::{debug, warn};
use neo4rs::{query, ConfigBuilder, Graph, Node, Relation};
use uuid::Uuid;

use super::{GraphStore, StoreError, DEFAULT_NODE_LABEL, DEFAULT_REL_TYPE};
use crate::graph_utils::graph::{
    sanitize_identifier, EdgeDirection, GraphEdge, GraphNode, GraphSnapshot, PropertyMap, UUID_KEY,
};

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
        }
    }
}

/// Neo4j adapter over the bolt driver. The driver pools connections
/// internally; each call here is one logical session.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, StoreError> {
        let driver_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .build()
            .map_err(|e| StoreError::Connection(format!("invalid driver config: {}", e)))?;
        let graph = Graph::connect(driver_config)
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {}", config.uri, e)))?;

        // Probe the connection so a bad endpoint fails here, not on first use.
        let mut probe = graph
            .execute(query("RETURN 1 AS probe"))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        probe
            .next()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        debug!("connected to neo4j at {}", config.uri);
        Ok(Self { graph })
    }
}

#[async_trait::async_trait]
impl GraphStore for Neo4jStore {
    async fn get_graph(&self) -> Result<GraphSnapshot, StoreError> {
        let mut nodes = Vec::new();
        let mut result = self
            .graph
            .execute(query("MATCH (n) RETURN n"))
            .await
            .map_err(query_err)?;
        while let Some(row) = result.next().await.map_err(query_err)? {
            let node: Node = row.get("n").map_err(mapping_err)?;
            nodes.push(map_node(&node));
        }

        let mut edges = Vec::new();
        let mut result = self
            .graph
            .execute(query("MATCH (a)-[r]->(b) RETURN r, a, b"))
            .await
            .map_err(query_err)?;
        while let Some(row) = result.next().await.map_err(query_err)? {
            let rel: Relation = row.get("r").map_err(mapping_err)?;
            let a: Node = row.get("a").map_err(mapping_err)?;
            let b: Node = row.get("b").map_err(mapping_err)?;
            edges.push(map_relation(&rel, &a, &b));
        }

        debug!("loaded {} nodes and {} relationships", nodes.len(), edges.len());
        Ok(GraphSnapshot::new(nodes, edges))
    }

    async fn add_node(
        &self,
        label: &str,
        mut properties: PropertyMap,
    ) -> Result<GraphNode, StoreError> {
        let node_uuid = Uuid::now_v7().to_string();
        properties.insert(UUID_KEY.to_string(), node_uuid);
        let safe_label = sanitize_identifier(label, DEFAULT_NODE_LABEL);
        let (set_clause, params) = property_setters("n", &properties);
        let text = format!("CREATE (n:{}) {} RETURN n", safe_label, set_clause);
        debug!("creating node label={}", safe_label);

        let mut q = query(&text);
        for (name, value) in params {
            q = q.param(&name, value);
        }
        let mut result = self.graph.execute(q).await.map_err(query_err)?;
        let row = result
            .next()
            .await
            .map_err(query_err)?
            .ok_or_else(|| StoreError::Query("node create returned no record".into()))?;
        let node: Node = row.get("n").map_err(mapping_err)?;
        Ok(map_node(&node))
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
        properties.insert(UUID_KEY.to_string(), rel_uuid);
        let safe_type = sanitize_identifier(rel_type, DEFAULT_REL_TYPE);
        // The store always holds (a)-[r]->(b); "<-" means the user stated the
        // endpoints in the opposite order.
        let (from_id, to_id) = match direction {
            EdgeDirection::Reverse => (to_id, from_id),
            _ => (from_id, to_id),
        };
        let (set_clause, params) = property_setters("r", &properties);
        let text = format!(
            "MATCH (a {{uuid: $from_uuid}}), (b {{uuid: $to_uuid}}) \
             CREATE (a)-[r:{}]->(b) {} RETURN r, a, b",
            safe_type, set_clause
        );
        debug!("creating relationship {}: {} -> {}", safe_type, from_id, to_id);

        let mut q = query(&text)
            .param("from_uuid", from_id)
            .param("to_uuid", to_id);
        for (name, value) in params {
            q = q.param(&name, value);
        }
        let mut result = self.graph.execute(q).await.map_err(query_err)?;
        let row = result
            .next()
            .await
            .map_err(query_err)?
            .ok_or_else(|| {
                StoreError::Query(format!(
                    "relationship create matched no endpoints ({} -> {})",
                    from_id, to_id
                ))
            })?;
        let rel: Relation = row.get("r").map_err(mapping_err)?;
        let a: Node = row.get("a").map_err(mapping_err)?;
        let b: Node = row.get("b").map_err(mapping_err)?;
        Ok(map_relation(&rel, &a, &b))
    }

    async fn update_node_properties(
        &self,
        id: &str,
        properties: PropertyMap,
    ) -> Result<(), StoreError> {
        if properties.is_empty() {
            return Ok(());
        }
        let (set_clause, params) = property_setters("n", &properties);
        let text = format!("MATCH (n) WHERE n.uuid = $nid {} RETURN n", set_clause);
        debug!("updating node {}", id);

        let mut q = query(&text).param("nid", id);
        for (name, value) in params {
            q = q.param(&name, value);
        }
        let mut stream = self.graph.execute(q).await.map_err(query_err)?;
        let mut affected = 0;
        while stream.next().await.map_err(query_err)?.is_some() {
            affected += 1;
        }
        if affected == 0 {
            // zero matches is a no-op by contract, not an error
            warn!("update matched no node with uuid {}", id);
        }
        Ok(())
    }

    async fn update_relationship_properties(
        &self,
        id: &str,
        properties: PropertyMap,
    ) -> Result<(), StoreError> {
        if properties.is_empty() {
            return Ok(());
        }
        let (set_clause, params) = property_setters("r", &properties);
        let text = format!("MATCH ()-[r]->() WHERE r.uuid = $rid {} RETURN r", set_clause);
        debug!("updating relationship {}", id);

        let mut q = query(&text).param("rid", id);
        for (name, value) in params {
            q = q.param(&name, value);
        }
        let mut stream = self.graph.execute(q).await.map_err(query_err)?;
        let mut affected = 0;
        while stream.next().await.map_err(query_err)?.is_some() {
            affected += 1;
        }
        if affected == 0 {
            warn!("update matched no relationship with uuid {}", id);
        }
        Ok(())
    }

    async fn list_type_tags(&self) -> Result<Vec<String>, StoreError> {
        let text = format!(
            "MATCH (n) WHERE n.`{key}` IS NOT NULL RETURN DISTINCT n.`{key}` AS tag ORDER BY tag",
            key = crate::graph_utils::graph::TYPE_TAG_KEY
        );
        let mut result = self.graph.execute(query(&text)).await.map_err(query_err)?;
        let mut tags = Vec::new();
        while let Some(row) = result.next().await.map_err(query_err)? {
            if let Ok(tag) = row.get::<String>("tag") {
                tags.push(tag);
            }
        }
        Ok(tags)
    }
}

fn query_err(e: neo4rs::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

fn mapping_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Mapping(e.to_string())
}

fn map_node(node: &Node) -> GraphNode {
    let properties = node_properties(node);
    let id = node_entity_id(node, &properties);
    let label = node
        .labels()
        .first()
        .map(|l| l.to_string())
        .or_else(|| properties.get("label").cloned())
        .unwrap_or_else(|| id.clone());
    GraphNode { id, label, properties }
}

fn map_relation(rel: &Relation, a: &Node, b: &Node) -> GraphEdge {
    let properties = relation_properties(rel);
    let id = properties
        .get(UUID_KEY)
        .cloned()
        .unwrap_or_else(|| rel.id().to_string());
    let from_props = node_properties(a);
    let to_props = node_properties(b);
    GraphEdge {
        id,
        from: node_entity_id(a, &from_props),
        to: node_entity_id(b, &to_props),
        rel_type: rel.typ().to_string(),
        properties,
        // reads always see the stored orientation
        direction: EdgeDirection::Forward,
    }
}

fn node_entity_id(node: &Node, properties: &PropertyMap) -> String {
    properties
        .get(UUID_KEY)
        .cloned()
        .unwrap_or_else(|| node.id().to_string())
}

fn node_properties(node: &Node) -> PropertyMap {
    let mut props = PropertyMap::new();
    for key in node.keys() {
        if let Some(value) = node_property_string(node, key) {
            props.insert(key.to_string(), value);
        }
    }
    props
}

fn relation_properties(rel: &Relation) -> PropertyMap {
    let mut props = PropertyMap::new();
    for key in rel.keys() {
        if let Some(value) = relation_property_string(rel, key) {
            props.insert(key.to_string(), value);
        }
    }
    props
}

// Properties written by this client are strings, but foreign data may carry
// other scalar types; stringify the common ones instead of dropping them.
fn node_property_string(node: &Node, key: &str) -> Option<String> {
    if let Ok(v) = node.get::<String>(key) {
        return Some(v);
    }
    if let Ok(v) = node.get::<i64>(key) {
        return Some(v.to_string());
    }
    if let Ok(v) = node.get::<f64>(key) {
        return Some(v.to_string());
    }
    if let Ok(v) = node.get::<bool>(key) {
        return Some(v.to_string());
    }
    None
}

fn relation_property_string(rel: &Relation, key: &str) -> Option<String> {
    if let Ok(v) = rel.get::<String>(key) {
        return Some(v);
    }
    if let Ok(v) = rel.get::<i64>(key) {
        return Some(v.to_string());
    }
    if let Ok(v) = rel.get::<f64>(key) {
        return Some(v.to_string());
    }
    if let Ok(v) = rel.get::<bool>(key) {
        return Some(v.to_string());
    }
    None
}

/// Build a `SET alias.key = $pN` clause with one parameter per property.
/// Keys go through backtick quoting; backticks themselves are stripped since
/// they cannot be escaped inside a quoted identifier portably.
fn property_setters(alias: &str, properties: &PropertyMap) -> (String, Vec<(String, String)>) {
    let mut clauses = Vec::with_capacity(properties.len());
    let mut params = Vec::with_capacity(properties.len());
    for (i, (key, value)) in properties.iter().enumerate() {
        let name = format!("p{}", i);
        let safe_key = key.replace('`', "");
        clauses.push(format!("{}.`{}` = ${}", alias, safe_key, name));
        params.push((name, value.clone()));
    }
    (format!("SET {}", clauses.join(", ")), params)
}
