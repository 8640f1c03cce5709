#![allow(clippy::collapsible_if)]
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, RichText, Stroke};
use log::{error, warn};

use crate::bridge::BridgeEvent;
use crate::controller::{ClickTarget, Controller, ViewPhase};
use crate::graph_utils::graph::{EdgeDirection, GraphEdge, GraphNode, PropertyMap, TYPE_TAG_KEY};
use crate::persistence::settings::AppSettings;
use crate::view::document;
use crate::view::export::{export_graph, ExportFormat};
use crate::worker::{StoreJob, StoreOutcome, StoreWorker};

// Style for toast notifications
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Info,
    Error,
}

/// Key/value rows backing a property editor; blank keys are dropped on read.
#[derive(Clone, Debug, Default)]
struct PropertyRows {
    rows: Vec<(String, String)>,
}

impl PropertyRows {
    fn from_map(map: &PropertyMap) -> Self {
        Self { rows: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect() }
    }

    fn to_map(&self) -> PropertyMap {
        let mut out = PropertyMap::new();
        for (k, v) in &self.rows {
            let key = k.trim();
            if key.is_empty() {
                continue;
            }
            out.insert(key.to_string(), v.clone());
        }
        out
    }

    fn ui(&mut self, ui: &mut egui::Ui) {
        let mut remove: Option<usize> = None;
        for (i, (key, value)) in self.rows.iter_mut().enumerate() {
            ui.horizontal(|ui| {
                ui.add(egui::TextEdit::singleline(key).hint_text("key").desired_width(140.0));
                ui.add(egui::TextEdit::singleline(value).hint_text("value").desired_width(200.0));
                if ui.small_button("✕").clicked() {
                    remove = Some(i);
                }
            });
        }
        if let Some(i) = remove {
            self.rows.remove(i);
        }
        if ui.button("Add field").clicked() {
            self.rows.push((String::new(), String::new()));
        }
    }
}

struct NodeEditor {
    id: String,
    label: String,
    rows: PropertyRows,
}

struct EdgeEditor {
    id: String,
    rel_type: String,
    rows: PropertyRows,
}

struct NewNodeForm {
    label: String,
    rows: PropertyRows,
}

struct NewRelationshipForm {
    from: Option<String>,
    to: Option<String>,
    rel_type: String,
    direction: EdgeDirection,
    rows: PropertyRows,
}

struct ConnectionForm {
    uri: String,
    user: String,
    password: String,
}

struct ExportForm {
    path: String,
    format: ExportFormat,
}

pub struct AtlasApp {
    settings: AppSettings,
    controller: Controller,
    worker: StoreWorker,
    outcomes: Receiver<StoreOutcome>,
    bridge_rx: Receiver<BridgeEvent>,
    // open windows
    node_editor: Option<NodeEditor>,
    edge_editor: Option<EdgeEditor>,
    new_node: Option<NewNodeForm>,
    new_relationship: Option<NewRelationshipForm>,
    connection: Option<ConnectionForm>,
    export: Option<ExportForm>,
    // transient toast
    notice: Option<(String, NoticeStyle, Instant)>,
    browser_opened: bool,
}

impl AtlasApp {
    pub fn new(
        settings: AppSettings,
        worker: StoreWorker,
        outcomes: Receiver<StoreOutcome>,
        bridge_rx: Receiver<BridgeEvent>,
    ) -> Self {
        let mut app = Self {
            settings,
            controller: Controller::new(),
            worker,
            outcomes,
            bridge_rx,
            node_editor: None,
            edge_editor: None,
            new_node: None,
            new_relationship: None,
            connection: None,
            export: None,
            notice: None,
            browser_opened: false,
        };
        app.request_type_tags();
        app.request_refresh();
        app
    }

    fn notify(&mut self, msg: impl Into<String>) {
        self.notice = Some((msg.into(), NoticeStyle::Info, Instant::now()));
    }

    fn notify_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{}", msg);
        self.notice = Some((msg, NoticeStyle::Error, Instant::now()));
    }

    fn submit(&mut self, job: StoreJob) {
        if !self.worker.submit(job) {
            self.notify_error("Store worker is not running");
        }
    }

    fn request_refresh(&mut self) {
        let token = self.controller.begin_load();
        self.submit(StoreJob::LoadGraph { token });
    }

    fn request_type_tags(&mut self) {
        self.submit(StoreJob::LoadTypeTags);
    }

    // Every successful mutation refreshes both the filter list and the view.
    fn after_mutation(&mut self) {
        self.request_type_tags();
        self.request_refresh();
    }

    /// Re-render the live document from the current (filtered) snapshot and
    /// point the browser at it on first render. Render errors leave the
    /// previous document in place.
    fn render_live_view(&mut self) {
        let filtered = self.controller.filtered();
        let html = match document::render_document(&filtered) {
            Ok(html) => document::inject_bridge_script(&html),
            Err(e) => {
                self.notify_error(format!("Rendering graph failed: {}", e));
                return;
            }
        };
        let path = self.settings.live_document_path();
        if let Err(e) = document::write_document(&path, &html) {
            self.notify_error(format!("Writing rendered graph failed: {}", e));
            return;
        }
        if self.settings.open_browser_on_start && !self.browser_opened {
            self.browser_opened = true;
            open_in_browser(&self.settings.bridge_url());
        }
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            match outcome {
                StoreOutcome::Connected(Ok(())) => {}
                StoreOutcome::Connected(Err(e)) => {
                    self.notify_error(format!(
                        "Connecting to Neo4j failed: {} — running on an empty in-memory store",
                        e
                    ));
                }
                StoreOutcome::GraphLoaded { token, result } => match result {
                    Ok(snapshot) => {
                        if self.controller.finish_load(token, snapshot) {
                            self.render_live_view();
                        }
                    }
                    Err(e) => {
                        self.controller.load_failed(token);
                        self.notify_error(format!("Loading graph failed: {}", e));
                    }
                },
                StoreOutcome::TypeTagsLoaded(Ok(tags)) => {
                    self.controller.set_type_tags(tags);
                }
                StoreOutcome::TypeTagsLoaded(Err(e)) => {
                    self.notify_error(format!("Loading type filter failed: {}", e));
                }
                StoreOutcome::NodeAdded(Ok(node)) => {
                    self.notify(format!("Created node {}", node.label));
                    self.after_mutation();
                }
                StoreOutcome::NodeAdded(Err(e)) => {
                    self.notify_error(format!("Creating node failed: {}", e));
                }
                StoreOutcome::RelationshipAdded(Ok(edge)) => {
                    self.notify(format!("Created relationship {}", edge.rel_type));
                    self.after_mutation();
                }
                StoreOutcome::RelationshipAdded(Err(e)) => {
                    self.notify_error(format!("Creating relationship failed: {}", e));
                }
                StoreOutcome::NodeUpdated(Ok(())) => {
                    self.notify("Node saved");
                    self.after_mutation();
                }
                StoreOutcome::NodeUpdated(Err(e)) => {
                    self.notify_error(format!("Updating node failed: {}", e));
                }
                StoreOutcome::RelationshipUpdated(Ok(())) => {
                    self.notify("Relationship saved");
                    self.after_mutation();
                }
                StoreOutcome::RelationshipUpdated(Err(e)) => {
                    self.notify_error(format!("Updating relationship failed: {}", e));
                }
            }
        }
    }

    fn drain_bridge_events(&mut self) {
        while let Ok(event) = self.bridge_rx.try_recv() {
            match self.controller.resolve_click(&event) {
                Some(ClickTarget::Node(node)) => self.open_node_editor(&node),
                Some(ClickTarget::Edge(edge)) => self.open_edge_editor(&edge),
                None => warn!("click on unknown element {:?} {}", event.kind, event.id),
            }
        }
    }

    fn open_node_editor(&mut self, node: &GraphNode) {
        self.node_editor = Some(NodeEditor {
            id: node.id.clone(),
            label: node.label.clone(),
            rows: PropertyRows::from_map(&node.properties),
        });
    }

    fn open_edge_editor(&mut self, edge: &GraphEdge) {
        self.edge_editor = Some(EdgeEditor {
            id: edge.id.clone(),
            rel_type: edge.rel_type.clone(),
            rows: PropertyRows::from_map(&edge.properties),
        });
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        // Compact menus so options remain accessible regardless of width
        ui.horizontal(|ui| {
            ui.label("Graph-Atlas");
            ui.menu_button("File", |ui| {
                if ui.button("Export Graph…").clicked() {
                    let default = self
                        .settings
                        .export_dir()
                        .join("graph.html")
                        .display()
                        .to_string();
                    self.export = Some(ExportForm { path: default, format: ExportFormat::Html });
                    ui.close();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
            ui.menu_button("View", |ui| {
                if ui.button("Open in Browser").clicked() {
                    open_in_browser(&self.settings.bridge_url());
                    ui.close();
                }
                if ui.button("Reload Graph").clicked() {
                    self.request_type_tags();
                    self.request_refresh();
                    ui.close();
                }
            });
            ui.menu_button("Settings", |ui| {
                if ui.button("Connection…").clicked() {
                    self.connection = Some(ConnectionForm {
                        uri: self.settings.neo4j_uri.clone(),
                        user: self.settings.neo4j_user.clone(),
                        password: self.settings.neo4j_password.clone(),
                    });
                    ui.close();
                }
            });
        });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Filter by type:");
            let selected_text = self
                .controller
                .selected_tag()
                .unwrap_or("All")
                .to_string();
            let mut changed = false;
            let mut selection = self.controller.selected_tag().map(str::to_string);
            egui::ComboBox::from_id_salt("type_tag_filter")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    if ui.selectable_value(&mut selection, None, "All").clicked() {
                        changed = true;
                    }
                    for tag in self.controller.type_tags().to_vec() {
                        if ui
                            .selectable_value(&mut selection, Some(tag.clone()), &tag)
                            .clicked()
                        {
                            changed = true;
                        }
                    }
                });
            if changed {
                self.controller.set_selected_tag(selection);
                // a filter change re-runs the whole read-filter-render cycle
                self.request_refresh();
            }

            ui.separator();
            if ui.button("New Node").clicked() {
                self.new_node = Some(NewNodeForm {
                    label: String::new(),
                    rows: PropertyRows { rows: vec![(TYPE_TAG_KEY.to_string(), String::new())] },
                });
            }
            if ui.button("New Relationship").clicked() {
                self.new_relationship = Some(NewRelationshipForm {
                    from: None,
                    to: None,
                    rel_type: "REL_TYPE".to_string(),
                    direction: EdgeDirection::Forward,
                    rows: PropertyRows::default(),
                });
            }
        });
    }

    fn status_panel(&mut self, ui: &mut egui::Ui) {
        let filtered = self.controller.filtered();
        ui.add_space(8.0);
        match self.controller.phase() {
            ViewPhase::Idle => {
                ui.label("No graph loaded yet.");
            }
            ViewPhase::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading graph…");
                });
            }
            ViewPhase::Rendered => {
                ui.label(format!(
                    "Showing {} nodes and {} relationships{}",
                    filtered.nodes.len(),
                    filtered.edges.len(),
                    self.controller
                        .selected_tag()
                        .map(|t| format!(" (type: {})", t))
                        .unwrap_or_default()
                ));
            }
        }
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("Live view:");
            ui.monospace(self.settings.bridge_url());
            if ui.small_button("open").clicked() {
                open_in_browser(&self.settings.bridge_url());
            }
        });
        ui.add_space(4.0);
        ui.small("Clicks on the rendered page open the matching editor here.");
    }

    fn show_node_editor(&mut self, ctx: &egui::Context) {
        let Some(mut editor) = self.node_editor.take() else { return };
        let mut open = true;
        let mut save = false;
        let mut cancel = false;
        egui::Window::new(format!("Node {}", editor.label))
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.monospace(&editor.id);
                ui.separator();
                editor.rows.ui(ui);
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if save {
            self.submit(StoreJob::UpdateNodeProperties {
                id: editor.id.clone(),
                properties: editor.rows.to_map(),
            });
        } else if open && !cancel {
            self.node_editor = Some(editor);
        }
    }

    fn show_edge_editor(&mut self, ctx: &egui::Context) {
        let Some(mut editor) = self.edge_editor.take() else { return };
        let mut open = true;
        let mut save = false;
        let mut cancel = false;
        egui::Window::new(format!("Relationship {}", editor.rel_type))
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.monospace(&editor.id);
                ui.separator();
                editor.rows.ui(ui);
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if save {
            self.submit(StoreJob::UpdateRelationshipProperties {
                id: editor.id.clone(),
                properties: editor.rows.to_map(),
            });
        } else if open && !cancel {
            self.edge_editor = Some(editor);
        }
    }

    fn show_new_node(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.new_node.take() else { return };
        let mut open = true;
        let mut create = false;
        let mut cancel = false;
        egui::Window::new("Create Node")
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.label("Label:");
                ui.text_edit_singleline(&mut form.label);
                ui.separator();
                form.rows.ui(ui);
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Create").clicked() {
                        create = true;
                    }
                    if ui.button("Preview").clicked() {
                        match document::render_preview(&form.label, &form.rows.to_map()) {
                            Ok(html) => {
                                let path = document::preview_path_now();
                                match document::write_document(&path, &html) {
                                    Ok(()) => open_path(&path),
                                    Err(e) => error!("writing preview failed: {}", e),
                                }
                            }
                            Err(e) => error!("rendering preview failed: {}", e),
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if create {
            self.submit(StoreJob::AddNode {
                label: form.label.clone(),
                properties: form.rows.to_map(),
            });
        } else if open && !cancel {
            self.new_node = Some(form);
        }
    }

    fn show_new_relationship(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.new_relationship.take() else { return };
        // (id, caption) pairs for the endpoint pickers
        let choices: Vec<(String, String)> = self
            .controller
            .snapshot()
            .nodes
            .iter()
            .map(|n| (n.id.clone(), format!("{} ({})", n.label, short_id(&n.id))))
            .collect();
        let caption = |sel: &Option<String>| -> String {
            sel.as_ref()
                .and_then(|id| choices.iter().find(|(cid, _)| cid == id))
                .map(|(_, c)| c.clone())
                .unwrap_or_else(|| "select a node".to_string())
        };
        let mut open = true;
        let mut create = false;
        let mut cancel = false;
        egui::Window::new("Create Relationship")
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.label("From:");
                egui::ComboBox::from_id_salt("new_rel_from")
                    .selected_text(caption(&form.from))
                    .show_ui(ui, |ui| {
                        for (id, c) in &choices {
                            ui.selectable_value(&mut form.from, Some(id.clone()), c);
                        }
                    });
                ui.label("To:");
                egui::ComboBox::from_id_salt("new_rel_to")
                    .selected_text(caption(&form.to))
                    .show_ui(ui, |ui| {
                        for (id, c) in &choices {
                            ui.selectable_value(&mut form.to, Some(id.clone()), c);
                        }
                    });
                ui.label("Type:");
                ui.text_edit_singleline(&mut form.rel_type);
                ui.label("Direction:");
                egui::ComboBox::from_id_salt("new_rel_direction")
                    .selected_text(form.direction.as_arrow())
                    .show_ui(ui, |ui| {
                        for d in EdgeDirection::ALL {
                            ui.selectable_value(&mut form.direction, d, d.as_arrow());
                        }
                    });
                ui.separator();
                form.rows.ui(ui);
                ui.separator();
                ui.horizontal(|ui| {
                    let ready = form.from.is_some() && form.to.is_some();
                    if ui.add_enabled(ready, egui::Button::new("Create")).clicked() {
                        create = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if create {
            if let (Some(from), Some(to)) = (form.from.clone(), form.to.clone()) {
                self.submit(StoreJob::AddRelationship {
                    from,
                    to,
                    rel_type: form.rel_type.clone(),
                    direction: form.direction,
                    properties: form.rows.to_map(),
                });
            }
        } else if open && !cancel {
            self.new_relationship = Some(form);
        }
    }

    fn show_connection(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.connection.take() else { return };
        let mut open = true;
        let mut save = false;
        let mut cancel = false;
        egui::Window::new("Connection Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("URI:");
                ui.text_edit_singleline(&mut form.uri);
                ui.label("User:");
                ui.text_edit_singleline(&mut form.user);
                ui.label("Password:");
                ui.add(egui::TextEdit::singleline(&mut form.password).password(true));
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if save {
            self.settings.neo4j_uri = form.uri.trim().to_string();
            self.settings.neo4j_user = form.user.trim().to_string();
            self.settings.neo4j_password = form.password.trim().to_string();
            match self.settings.save() {
                Ok(()) => self.notify("Connection settings saved; restart to reconnect"),
                Err(e) => self.notify_error(format!("Saving settings failed: {}", e)),
            }
        } else if open && !cancel {
            self.connection = Some(form);
        }
    }

    fn show_export(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.export.take() else { return };
        let mut open = true;
        let mut run = false;
        let mut cancel = false;
        egui::Window::new("Export Graph")
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.label("Destination:");
                ui.add(egui::TextEdit::singleline(&mut form.path).desired_width(320.0));
                ui.label("Format:");
                egui::ComboBox::from_id_salt("export_format")
                    .selected_text(form.format.label())
                    .show_ui(ui, |ui| {
                        for f in ExportFormat::ALL {
                            ui.selectable_value(&mut form.format, f, f.label());
                        }
                    });
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui.button("Export").clicked() {
                        run = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if run {
            // exports always cover the whole graph, independent of the filter
            let snapshot = self.controller.snapshot().clone();
            match export_graph(&snapshot, form.format, &PathBuf::from(form.path.trim())) {
                Ok(written) => {
                    let names: Vec<String> =
                        written.iter().map(|p| p.display().to_string()).collect();
                    self.notify(format!("Exported to {}", names.join(", ")));
                }
                Err(e) => self.notify_error(format!("Export failed: {}", e)),
            }
        } else if open && !cancel {
            self.export = Some(form);
        }
    }

    // Bottom-right transient toast (visible for 4 seconds)
    fn show_notice(&self, ctx: &egui::Context) {
        let Some((msg, style, when)) = &self.notice else { return };
        if when.elapsed() > Duration::from_secs(4) {
            return;
        }
        egui::Area::new("bottom_right_toast".into())
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .interactable(false)
            .show(ctx, |ui| {
                let (stroke_col, text_col) = match style {
                    NoticeStyle::Info => (Color32::from_gray(100), Color32::LIGHT_GREEN),
                    NoticeStyle::Error => (Color32::from_rgb(140, 60, 60), Color32::LIGHT_RED),
                };
                egui::Frame::popup(ui.style())
                    .corner_radius(egui::CornerRadius::same(8))
                    .stroke(Stroke { width: 1.0, color: stroke_col })
                    .fill(Color32::from_rgba_premultiplied(30, 30, 30, 230))
                    .inner_margin(egui::Margin::symmetric(12, 8))
                    .show(ui, |ui| {
                        ui.label(RichText::new(msg.as_str()).color(text_col));
                    });
            });
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_outcomes();
        self.drain_bridge_events();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
            self.toolbar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.status_panel(ui);
        });

        self.show_node_editor(ctx);
        self.show_edge_editor(ctx);
        self.show_new_node(ctx);
        self.show_new_relationship(ctx);
        self.show_connection(ctx);
        self.show_export(ctx);
        self.show_notice(ctx);

        // keep polling the worker and bridge channels while idle
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

fn short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 8 {
        id.to_string()
    } else {
        chars[chars.len() - 8..].iter().collect()
    }
}

fn open_in_browser(url: &str) {
    open_target(url);
}

fn open_path(path: &std::path::Path) {
    open_target(&path.display().to_string());
}

// Hand the target to the OS default handler; failures only get logged.
fn open_target(target: &str) {
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(target).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open").arg(target).spawn();
    }
    #[cfg(target_os = "windows")]
    {
        let _ = std::process::Command::new("cmd").args(["/C", "start", target]).spawn();
    }
}
