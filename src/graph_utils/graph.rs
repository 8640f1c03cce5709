use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// Basic type aliases for clarity
pub type EntityId = String;
type Key = String;
type Value = String;

/// Free-form attributes attached to an entity. Insertion order is kept so the
/// editor windows list fields the way the user entered them.
pub type PropertyMap = IndexMap<Key, Value>;

/// Property key holding the user-facing type tag the filter selector works on.
/// Existing databases already carry this key, so it is not renamed.
pub const TYPE_TAG_KEY: &str = "тип";

/// Property key this client stamps onto every entity it creates. Reads prefer
/// it over the store's internal element id, which is not stable across
/// compaction.
pub const UUID_KEY: &str = "uuid";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: EntityId,
    pub label: String,
    pub properties: PropertyMap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EntityId,
    pub from: EntityId,
    pub to: EntityId,
    pub rel_type: String,
    pub properties: PropertyMap,
    pub direction: EdgeDirection,
}

/// How an edge is drawn. Storage always holds a single directed edge from
/// `from` to `to`; `Reverse` swaps the endpoints at creation time and `Both`
/// only changes the arrow rendering.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeDirection {
    #[default]
    Forward,
    Reverse,
    Both,
}

impl EdgeDirection {
    pub const ALL: [EdgeDirection; 3] =
        [EdgeDirection::Forward, EdgeDirection::Reverse, EdgeDirection::Both];

    /// Anything that is not one of the two single-arrow spellings counts as
    /// bidirectional, including the legacy "двунаправленное" label.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "->" => EdgeDirection::Forward,
            "<-" => EdgeDirection::Reverse,
            _ => EdgeDirection::Both,
        }
    }

    pub fn as_arrow(&self) -> &'static str {
        match self {
            EdgeDirection::Forward => "->",
            EdgeDirection::Reverse => "<-",
            EdgeDirection::Both => "<->",
        }
    }

    /// vis-network `arrows` value for this direction.
    pub fn vis_arrows(&self) -> &'static str {
        match self {
            EdgeDirection::Forward => "to",
            EdgeDirection::Reverse => "from",
            EdgeDirection::Both => "to,from",
        }
    }
}

/// One full read of the store: disposable, rebuilt on every refresh. Keeps
/// id -> index maps so a click on the rendered page resolves without another
/// round trip to the store.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    node_index: HashMap<EntityId, usize>,
    edge_index: HashMap<EntityId, usize>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (i, n) in nodes.iter().enumerate() {
            // first occurrence wins when ids collide
            node_index.entry(n.id.clone()).or_insert(i);
        }
        let mut edge_index = HashMap::with_capacity(edges.len());
        for (i, e) in edges.iter().enumerate() {
            edge_index.entry(e.id.clone()).or_insert(i);
        }
        Self { nodes, edges, node_index, edge_index }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Client-side post-filter: keep nodes whose type tag equals `tag`, then
    /// only the edges with both endpoints surviving. `None` keeps everything.
    pub fn filter_by_type_tag(&self, tag: Option<&str>) -> GraphSnapshot {
        let Some(tag) = tag else {
            return self.clone();
        };
        let nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .filter(|n| n.properties.get(TYPE_TAG_KEY).map(String::as_str) == Some(tag))
            .cloned()
            .collect();
        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges: Vec<GraphEdge> = self
            .edges
            .iter()
            .filter(|e| kept.contains(e.from.as_str()) && kept.contains(e.to.as_str()))
            .cloned()
            .collect();
        GraphSnapshot::new(nodes, edges)
    }

    /// Distinct type-tag values present in this snapshot, sorted. The live
    /// filter list comes from the store; this is the offline fallback.
    pub fn type_tags(&self) -> Vec<String> {
        let tags: BTreeSet<String> = self
            .nodes
            .iter()
            .filter_map(|n| n.properties.get(TYPE_TAG_KEY))
            .cloned()
            .collect();
        tags.into_iter().collect()
    }
}

/// Strip a label or relationship type down to what is safe to template into a
/// query, falling back to a generic default when nothing survives. Letters,
/// digits and underscore only; unicode letters kept so non-ASCII labels keep
/// working.
pub fn sanitize_identifier(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() { fallback.to_string() } else { cleaned }
}

/// Render a property map as the multi-line tooltip text shown on hover.
pub fn properties_tooltip(properties: &PropertyMap) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}
