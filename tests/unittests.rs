use graph_atlas::bridge::{BridgeEvent, ElementKind};
use graph_atlas::controller::{ClickTarget, Controller, ViewPhase};
use graph_atlas::graph_utils::graph::{
    properties_tooltip, sanitize_identifier, EdgeDirection, GraphEdge, GraphNode, GraphSnapshot,
    PropertyMap, TYPE_TAG_KEY, UUID_KEY,
};
use graph_atlas::persistence::settings::AppSettings;
use graph_atlas::store::memory::MemoryStore;
use graph_atlas::store::{GraphStore, StoreError};
use graph_atlas::view::document;
use graph_atlas::view::export::{export_graph, ExportFormat};

fn props(entries: &[(&str, &str)]) -> PropertyMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The §8 end-to-end fixture: two User nodes, one Company, WORKS_AT x2, KNOWS.
async fn seeded_store() -> (MemoryStore, Vec<String>) {
    let store = MemoryStore::new();
    let n1 = store
        .add_node("Person", props(&[(TYPE_TAG_KEY, "User")]))
        .await
        .expect("node 1");
    let n2 = store
        .add_node("Person", props(&[(TYPE_TAG_KEY, "User")]))
        .await
        .expect("node 2");
    let n3 = store
        .add_node("Company", props(&[(TYPE_TAG_KEY, "Company")]))
        .await
        .expect("node 3");
    store
        .add_relationship(&n1.id, &n3.id, "WORKS_AT", EdgeDirection::Forward, PropertyMap::new())
        .await
        .expect("rel 1");
    store
        .add_relationship(&n2.id, &n3.id, "WORKS_AT", EdgeDirection::Forward, PropertyMap::new())
        .await
        .expect("rel 2");
    store
        .add_relationship(&n1.id, &n2.id, "KNOWS", EdgeDirection::Forward, PropertyMap::new())
        .await
        .expect("rel 3");
    (store, vec![n1.id, n2.id, n3.id])
}

#[tokio::test]
async fn created_node_is_read_back_with_uuid_identity() {
    let store = MemoryStore::new();
    let created = store
        .add_node("Person", props(&[("name", "Charlie")]))
        .await
        .expect("create ok");

    let snapshot = store.get_graph().await.expect("read ok");
    assert_eq!(snapshot.nodes.len(), 1);
    let node = &snapshot.nodes[0];
    assert!(!node.id.is_empty());
    assert_eq!(node.id, created.id);
    assert_eq!(node.properties.get("name").map(String::as_str), Some("Charlie"));
    // the client stamps its own uuid and uses it as the identity
    assert_eq!(node.properties.get(UUID_KEY), Some(&node.id));
}

#[tokio::test]
async fn node_ids_are_stable_across_reads_without_writes() {
    let (store, _) = seeded_store().await;
    let first = store.get_graph().await.expect("first read");
    let second = store.get_graph().await.expect("second read");
    let ids = |s: &GraphSnapshot| {
        let mut v: Vec<String> = s.nodes.iter().map(|n| n.id.clone()).collect();
        v.sort();
        v
    };
    assert_eq!(ids(&first), ids(&second));
}

#[tokio::test]
async fn relationship_forward_keeps_endpoint_order() {
    let store = MemoryStore::new();
    let a = store.add_node("Person", PropertyMap::new()).await.unwrap();
    let b = store.add_node("Person", PropertyMap::new()).await.unwrap();
    store
        .add_relationship(&a.id, &b.id, "FRIEND", EdgeDirection::Forward, PropertyMap::new())
        .await
        .expect("create ok");

    let snapshot = store.get_graph().await.unwrap();
    assert_eq!(snapshot.edges.len(), 1);
    let edge = &snapshot.edges[0];
    assert_eq!(edge.rel_type, "FRIEND");
    assert_eq!(edge.from, a.id);
    assert_eq!(edge.to, b.id);
}

#[tokio::test]
async fn relationship_reverse_swaps_endpoints_before_write() {
    let store = MemoryStore::new();
    let a = store.add_node("Person", PropertyMap::new()).await.unwrap();
    let b = store.add_node("Person", PropertyMap::new()).await.unwrap();
    store
        .add_relationship(&a.id, &b.id, "FRIEND", EdgeDirection::Reverse, PropertyMap::new())
        .await
        .expect("create ok");

    let snapshot = store.get_graph().await.unwrap();
    let edge = &snapshot.edges[0];
    assert_eq!(edge.from, b.id);
    assert_eq!(edge.to, a.id);
}

#[tokio::test]
async fn bidirectional_is_a_rendering_hint_not_a_storage_variant() {
    let store = MemoryStore::new();
    let a = store.add_node("Person", PropertyMap::new()).await.unwrap();
    let b = store.add_node("Person", PropertyMap::new()).await.unwrap();
    store
        .add_relationship(&a.id, &b.id, "KNOWS", EdgeDirection::Both, PropertyMap::new())
        .await
        .expect("create ok");

    let snapshot = store.get_graph().await.unwrap();
    let edge = &snapshot.edges[0];
    // stored endpoints keep the stated order and reads see a plain directed edge
    assert_eq!(edge.from, a.id);
    assert_eq!(edge.to, b.id);
    assert_eq!(edge.direction, EdgeDirection::Forward);
}

#[tokio::test]
async fn relationship_with_missing_endpoint_fails() {
    let store = MemoryStore::new();
    let a = store.add_node("Person", PropertyMap::new()).await.unwrap();
    let err = store
        .add_relationship(&a.id, "no-such-node", "KNOWS", EdgeDirection::Forward, PropertyMap::new())
        .await;
    assert!(matches!(err, Err(StoreError::Query(_))));
}

#[tokio::test]
async fn update_merges_properties_instead_of_replacing() {
    let store = MemoryStore::new();
    let node = store
        .add_node("Person", props(&[("name", "Ada")]))
        .await
        .unwrap();
    store
        .update_node_properties(&node.id, props(&[("age", "30")]))
        .await
        .expect("update ok");

    let snapshot = store.get_graph().await.unwrap();
    let read = snapshot.node(&node.id).expect("node present");
    assert_eq!(read.properties.get("name").map(String::as_str), Some("Ada"));
    assert_eq!(read.properties.get("age").map(String::as_str), Some("30"));
}

#[tokio::test]
async fn update_of_missing_entity_is_a_silent_noop() {
    let (store, _) = seeded_store().await;
    let before = store.get_graph().await.unwrap();
    store
        .update_node_properties("no-such-uuid", props(&[("k", "v")]))
        .await
        .expect("no-op, not an error");
    store
        .update_relationship_properties("no-such-uuid", props(&[("k", "v")]))
        .await
        .expect("no-op, not an error");
    let after = store.get_graph().await.unwrap();
    assert_eq!(before.nodes.len(), after.nodes.len());
    assert!(after.nodes.iter().all(|n| !n.properties.contains_key("k")));
}

#[tokio::test]
async fn empty_labels_fall_back_to_generic_defaults() {
    let store = MemoryStore::new();
    let node = store.add_node("!!!", PropertyMap::new()).await.unwrap();
    assert_eq!(node.label, "Node");
    let other = store.add_node("", PropertyMap::new()).await.unwrap();
    let edge = store
        .add_relationship(&node.id, &other.id, "@#$", EdgeDirection::Forward, PropertyMap::new())
        .await
        .unwrap();
    assert_eq!(edge.rel_type, "REL");
}

#[tokio::test]
async fn type_tag_filter_keeps_matching_nodes_and_internal_edges() {
    let (store, ids) = seeded_store().await;
    let snapshot = store.get_graph().await.unwrap();
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(snapshot.edges.len(), 3);

    let company = snapshot.filter_by_type_tag(Some("Company"));
    assert_eq!(company.nodes.len(), 1);
    assert_eq!(company.edges.len(), 0);

    let users = snapshot.filter_by_type_tag(Some("User"));
    assert_eq!(users.nodes.len(), 2);
    assert_eq!(users.edges.len(), 1);
    assert_eq!(users.edges[0].rel_type, "KNOWS");
    assert_eq!(users.edges[0].from, ids[0]);

    let all = snapshot.filter_by_type_tag(None);
    assert_eq!(all.nodes.len(), 3);
    assert_eq!(all.edges.len(), 3);
}

#[tokio::test]
async fn type_tags_are_distinct_and_sorted() {
    let (store, _) = seeded_store().await;
    let tags = store.list_type_tags().await.expect("tags ok");
    assert_eq!(tags, vec!["Company".to_string(), "User".to_string()]);
}

#[test]
fn direction_parsing_covers_the_legacy_bidirectional_spelling() {
    assert_eq!(EdgeDirection::parse("->"), EdgeDirection::Forward);
    assert_eq!(EdgeDirection::parse("<-"), EdgeDirection::Reverse);
    assert_eq!(EdgeDirection::parse("<->"), EdgeDirection::Both);
    assert_eq!(EdgeDirection::parse("двунаправленное"), EdgeDirection::Both);
    assert_eq!(EdgeDirection::parse(""), EdgeDirection::Both);
}

#[test]
fn sanitize_strips_to_safe_identifier_with_fallback() {
    assert_eq!(sanitize_identifier("Person!@#", "Node"), "Person");
    assert_eq!(sanitize_identifier("WORKS AT", "REL"), "WORKSAT");
    assert_eq!(sanitize_identifier("---", "Node"), "Node");
    assert_eq!(sanitize_identifier("", "REL"), "REL");
    // unicode letters survive so non-ASCII labels keep working
    assert_eq!(sanitize_identifier("Персона", "Node"), "Персона");
}

#[test]
fn snapshot_lookup_is_indexed_and_first_match_wins() {
    let dup_a = GraphNode {
        id: "dup".into(),
        label: "First".into(),
        properties: PropertyMap::new(),
    };
    let dup_b = GraphNode {
        id: "dup".into(),
        label: "Second".into(),
        properties: PropertyMap::new(),
    };
    let snapshot = GraphSnapshot::new(vec![dup_a, dup_b], Vec::new());
    assert_eq!(snapshot.node("dup").map(|n| n.label.as_str()), Some("First"));
    assert!(snapshot.node("missing").is_none());
}

fn sample_snapshot() -> GraphSnapshot {
    let n1 = GraphNode {
        id: "n1".into(),
        label: "Person".into(),
        properties: props(&[("name", "Ada")]),
    };
    let n2 = GraphNode {
        id: "n2".into(),
        label: "Company".into(),
        properties: PropertyMap::new(),
    };
    let edge = |id: &str, dir: EdgeDirection| GraphEdge {
        id: id.into(),
        from: "n1".into(),
        to: "n2".into(),
        rel_type: "WORKS_AT".into(),
        properties: props(&[("since", "2021")]),
        direction: dir,
    };
    GraphSnapshot::new(
        vec![n1, n2],
        vec![
            edge("e1", EdgeDirection::Forward),
            edge("e2", EdgeDirection::Reverse),
            edge("e3", EdgeDirection::Both),
        ],
    )
}

#[test]
fn document_embeds_elements_and_arrow_styles() {
    let html = document::render_document(&sample_snapshot()).expect("render ok");
    assert!(html.contains("\"id\":\"n1\""));
    assert!(html.contains("\"id\":\"e1\""));
    assert!(html.contains("\"arrows\":\"to\""));
    assert!(html.contains("\"arrows\":\"from\""));
    assert!(html.contains("\"arrows\":\"to,from\""));
    assert!(html.contains("name: Ada"));
    // plain render carries no bridge wiring
    assert!(!html.contains(document::BRIDGE_MARKER));
}

#[test]
fn bridge_script_is_appended_exactly_once() {
    let html = document::render_document(&sample_snapshot()).expect("render ok");
    let live = document::inject_bridge_script(&html);
    assert!(live.contains(document::BRIDGE_MARKER));
    assert_eq!(live.matches("</body>").count(), 1);
}

#[test]
fn tooltip_renders_one_property_per_line() {
    let map = props(&[("name", "Ada"), ("role", "Engineer")]);
    assert_eq!(properties_tooltip(&map), "name: Ada\nrole: Engineer");
    assert_eq!(properties_tooltip(&PropertyMap::new()), "");
}

#[test]
fn stale_load_results_are_discarded() {
    let mut controller = Controller::new();
    let first = controller.begin_load();
    let second = controller.begin_load();
    assert!(second > first);
    assert_eq!(controller.phase(), ViewPhase::Loading);

    // the older read arrives late: rejected, phase unchanged
    assert!(!controller.finish_load(first, sample_snapshot()));
    assert_eq!(controller.phase(), ViewPhase::Loading);

    assert!(controller.finish_load(second, sample_snapshot()));
    assert_eq!(controller.phase(), ViewPhase::Rendered);
    assert_eq!(controller.snapshot().nodes.len(), 2);
}

#[test]
fn failed_load_keeps_the_previous_view() {
    let mut controller = Controller::new();
    let token = controller.begin_load();
    assert!(controller.finish_load(token, sample_snapshot()));

    let failing = controller.begin_load();
    controller.load_failed(failing);
    assert_eq!(controller.phase(), ViewPhase::Rendered);
    assert_eq!(controller.snapshot().nodes.len(), 2);
}

#[test]
fn clicks_resolve_against_the_snapshot_index() {
    let mut controller = Controller::new();
    let token = controller.begin_load();
    controller.finish_load(token, sample_snapshot());

    let node_click = BridgeEvent { kind: ElementKind::Node, id: "n1".into() };
    match controller.resolve_click(&node_click) {
        Some(ClickTarget::Node(node)) => assert_eq!(node.label, "Person"),
        other => panic!("expected node target, got {:?}", other),
    }
    let edge_click = BridgeEvent { kind: ElementKind::Edge, id: "e2".into() };
    assert!(matches!(controller.resolve_click(&edge_click), Some(ClickTarget::Edge(_))));
    let gone = BridgeEvent { kind: ElementKind::Node, id: "ghost".into() };
    assert!(controller.resolve_click(&gone).is_none());
}

#[test]
fn filter_selection_is_cleared_when_its_tag_disappears() {
    let mut controller = Controller::new();
    controller.set_type_tags(vec!["User".into(), "Company".into()]);
    controller.set_selected_tag(Some("User".into()));
    controller.set_type_tags(vec!["Company".into()]);
    assert_eq!(controller.selected_tag(), None);
}

#[test]
fn settings_round_trip_and_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");

    let mut settings = AppSettings::default();
    settings.neo4j_uri = "bolt://db.example:7687".to_string();
    settings.neo4j_password = "secret".to_string();
    settings.bridge_port = 9000;
    settings.save_to(&path).expect("save ok");

    let loaded = AppSettings::load_from(&path).expect("load ok");
    assert_eq!(loaded.neo4j_uri, "bolt://db.example:7687");
    assert_eq!(loaded.neo4j_password, "secret");
    assert_eq!(loaded.bridge_endpoint(), "127.0.0.1:9000");

    // partial files pick up defaults for everything else
    std::fs::write(&path, r#"{"neo4j_uri": "bolt://other:7687"}"#).expect("write ok");
    let partial = AppSettings::load_from(&path).expect("load ok");
    assert_eq!(partial.neo4j_uri, "bolt://other:7687");
    assert_eq!(partial.neo4j_user, "neo4j");
    assert!(partial.open_browser_on_start);
}

#[test]
fn export_writes_the_requested_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let snapshot = sample_snapshot();

    let html_path = dir.path().join("graph.html");
    let written = export_graph(&snapshot, ExportFormat::Html, &html_path).expect("html ok");
    assert_eq!(written, vec![html_path.clone()]);
    let html = std::fs::read_to_string(&html_path).expect("read ok");
    assert!(!html.contains(document::BRIDGE_MARKER));

    let json_path = dir.path().join("graph.json");
    export_graph(&snapshot, ExportFormat::Json, &json_path).expect("json ok");
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).expect("read ok"))
            .expect("valid json");
    assert_eq!(parsed["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(parsed["relationships"].as_array().map(Vec::len), Some(3));

    let csv_base = dir.path().join("graph.csv");
    let written = export_graph(&snapshot, ExportFormat::Csv, &csv_base).expect("csv ok");
    assert_eq!(written.len(), 2);
    assert!(dir.path().join("graph_nodes.csv").exists());
    assert!(dir.path().join("graph_relationships.csv").exists());
}
