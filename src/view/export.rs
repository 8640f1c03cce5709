use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::graph_utils::graph::{GraphSnapshot, PropertyMap};

use super::document;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Json,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Html, ExportFormat::Json, ExportFormat::Csv];

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Html => "HTML",
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Export the (unfiltered) snapshot to `path`. HTML re-renders the page
/// without the bridge script; CSV splits into `{stem}_nodes.csv` and
/// `{stem}_relationships.csv`. Returns every file written.
pub fn export_graph(
    snapshot: &GraphSnapshot,
    format: ExportFormat,
    path: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    match format {
        ExportFormat::Html => {
            let html = document::render_document(snapshot)?;
            document::write_document(path, &html)?;
            Ok(vec![path.to_path_buf()])
        }
        ExportFormat::Json => export_graph_json(snapshot, path).map(|p| vec![p]),
        ExportFormat::Csv => export_graph_csv(snapshot, path).map(|(n, r)| vec![n, r]),
    }
}

fn export_graph_json(snapshot: &GraphSnapshot, path: &Path) -> anyhow::Result<PathBuf> {
    #[derive(Serialize)]
    struct NodeOut<'a> {
        id: &'a str,
        label: &'a str,
        properties: &'a PropertyMap,
    }
    #[derive(Serialize)]
    struct RelOut<'a> {
        id: &'a str,
        from: &'a str,
        to: &'a str,
        r#type: &'a str,
        properties: &'a PropertyMap,
    }
    #[derive(Serialize)]
    struct GraphOut<'a> {
        nodes: Vec<NodeOut<'a>>,
        relationships: Vec<RelOut<'a>>,
    }

    let g = GraphOut {
        nodes: snapshot
            .nodes
            .iter()
            .map(|n| NodeOut { id: &n.id, label: &n.label, properties: &n.properties })
            .collect(),
        relationships: snapshot
            .edges
            .iter()
            .map(|r| RelOut {
                id: &r.id,
                from: &r.from,
                to: &r.to,
                r#type: &r.rel_type,
                properties: &r.properties,
            })
            .collect(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let f = File::create(path)?;
    serde_json::to_writer_pretty(f, &g)?;
    // ensure newline at end
    let mut f2 = std::fs::OpenOptions::new().append(true).open(path)?;
    let _ = f2.write_all(b"\n");
    Ok(path.to_path_buf())
}

fn export_graph_csv(snapshot: &GraphSnapshot, base_path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let parent = base_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("graph");
    let nodes_path = parent.join(format!("{}_nodes.csv", stem));
    let rels_path = parent.join(format!("{}_relationships.csv", stem));

    {
        let mut wtr = csv::Writer::from_path(&nodes_path)?;
        wtr.write_record(["id", "label", "properties_json"])?;
        for n in &snapshot.nodes {
            let props_json = serde_json::to_string(&n.properties).unwrap_or_else(|_| "{}".into());
            wtr.write_record(&[n.id.clone(), n.label.clone(), props_json])?;
        }
        wtr.flush()?;
    }
    {
        let mut wtr = csv::Writer::from_path(&rels_path)?;
        wtr.write_record(["id", "from", "to", "type", "properties_json"])?;
        for r in &snapshot.edges {
            let props_json = serde_json::to_string(&r.properties).unwrap_or_else(|_| "{}".into());
            wtr.write_record(&[
                r.id.clone(),
                r.from.clone(),
                r.to.clone(),
                r.rel_type.clone(),
                props_json,
            ])?;
        }
        wtr.flush()?;
    }
    Ok((nodes_path, rels_path))
}
