use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use crate::graph_utils::graph::{properties_tooltip, GraphNode, GraphSnapshot, PropertyMap};

/// Marker left in the page so tests (and the bridge injector) can tell a live
/// document from a plain export.
pub const BRIDGE_MARKER: &str = "/bridge/click";

/// Fixed script block appended to the live view. It relies on the global
/// `network` the base document exposes and forwards element clicks to the
/// native side as a (kind, id) pair.
const BRIDGE_SCRIPT: &str = r#"<script type="text/javascript">
network.on("click", function (params) {
    var kind = null, id = null;
    if (params.nodes.length > 0) { kind = "node"; id = String(params.nodes[0]); }
    else if (params.edges.length > 0) { kind = "edge"; id = String(params.edges[0]); }
    if (kind !== null) {
        fetch("/bridge/click", {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify({ kind: kind, id: id })
        });
    }
});
</script>
</body>"#;

/// Build the self-contained vis-network page for a snapshot. The result is a
/// static artifact: data is embedded as JSON, vis-network comes from a CDN,
/// and there is no server-side rendering loop behind it.
pub fn render_document(snapshot: &GraphSnapshot) -> anyhow::Result<String> {
    let nodes_json: Vec<serde_json::Value> = snapshot
        .nodes
        .iter()
        .map(|n| {
            serde_json::json!({
                "id": n.id,
                "label": n.label,
                "title": properties_tooltip(&n.properties),
            })
        })
        .collect();

    let edges_json: Vec<serde_json::Value> = snapshot
        .edges
        .iter()
        .map(|e| {
            serde_json::json!({
                "id": e.id,
                "from": e.from,
                "to": e.to,
                "label": e.rel_type,
                "title": properties_tooltip(&e.properties),
                "arrows": e.direction.vis_arrows(),
            })
        })
        .collect();

    render_page(
        &serde_json::to_string(&nodes_json)?,
        &serde_json::to_string(&edges_json)?,
        snapshot.nodes.len(),
        snapshot.edges.len(),
    )
}

/// One-node preview page for the create-node window.
pub fn render_preview(label: &str, properties: &PropertyMap) -> anyhow::Result<String> {
    let node = GraphNode {
        id: "preview".to_string(),
        label: if label.trim().is_empty() { "Node".to_string() } else { label.to_string() },
        properties: properties.clone(),
    };
    render_document(&GraphSnapshot::new(vec![node], Vec::new()))
}

fn render_page(
    nodes_json: &str,
    edges_json: &str,
    node_count: usize,
    edge_count: usize,
) -> anyhow::Result<String> {
    let html = format!(
        r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Graph-Atlas</title>
    <script type="text/javascript" src="https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js"></script>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background: #10131a; color: #c9ced9; height: 100vh; display: flex; flex-direction: column; overflow: hidden; }}
        #header {{ padding: 10px 18px; background: #161b24; border-bottom: 1px solid #252c3a; display: flex; align-items: center; gap: 18px; flex-shrink: 0; }}
        #header h1 {{ font-size: 1.0em; font-weight: 700; letter-spacing: -0.3px; color: #e8ebf2; }}
        .stat {{ font-size: 0.8em; color: #7c8596; background: #1c2230; padding: 3px 10px; border-radius: 100px; }}
        .stat b {{ color: #6ea8fe; }}
        #hint {{ margin-left: auto; font-size: 0.75em; color: #5a6374; }}
        #graph {{ flex: 1; }}
    </style>
</head>
<body>
    <div id="header">
        <h1>Graph-Atlas</h1>
        <span class="stat"><b>{node_count}</b> nodes</span>
        <span class="stat"><b>{edge_count}</b> relationships</span>
        <span id="hint">click a node or relationship to edit it</span>
    </div>
    <div id="graph"></div>
    <script type="text/javascript">
        var nodes = new vis.DataSet({nodes_json});
        var edges = new vis.DataSet({edges_json});
        var container = document.getElementById("graph");
        var options = {{
            nodes: {{
                shape: "dot",
                size: 14,
                color: {{ background: "#3d6fb4", border: "#6ea8fe", highlight: {{ background: "#5588cc", border: "#9cc2ff" }} }},
                font: {{ color: "#c9ced9", size: 14 }}
            }},
            edges: {{
                color: {{ color: "#55617a", highlight: "#6ea8fe" }},
                font: {{ color: "#8a93a6", size: 11, strokeWidth: 0 }},
                smooth: {{ type: "dynamic" }}
            }},
            physics: {{
                solver: "forceAtlas2Based",
                forceAtlas2Based: {{ gravitationalConstant: -60, springLength: 140 }},
                stabilization: {{ iterations: 200 }}
            }},
            interaction: {{ hover: true, tooltipDelay: 150 }}
        }};
        var network = new vis.Network(container, {{ nodes: nodes, edges: edges }}, options);
        window.network = network;
    </script>
</body>
</html>"##
    );
    Ok(html)
}

/// Append the fixed bridge script block right before `</body>`. Exports skip
/// this step so the artifact stays inert outside the app.
pub fn inject_bridge_script(html: &str) -> String {
    html.replacen("</body>", BRIDGE_SCRIPT, 1)
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("html.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

/// Write a rendered page, creating parent directories as needed. The write is
/// atomic so the bridge server never serves a half-written page.
pub fn write_document(path: &Path, html: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    atomic_write(path, html.as_bytes())?;
    Ok(())
}

/// Timestamped path for throwaway preview pages under the OS temp dir.
pub fn preview_path_now() -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    let mut p = std::env::temp_dir();
    p.push("Graph-Atlas");
    p.push(format!("preview_{}.html", stamp));
    p
}
