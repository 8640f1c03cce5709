//! Interaction controller: owns the view phase, the current snapshot, the
//! filter state and the request-token bookkeeping. GUI-toolkit agnostic; the
//! shell submits jobs and feeds outcomes back in.

use log::debug;

use crate::bridge::{BridgeEvent, ElementKind};
use crate::graph_utils::graph::{GraphEdge, GraphNode, GraphSnapshot};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Loading,
    Rendered,
}

/// A click resolved against the snapshot that produced the rendered page.
#[derive(Clone, Debug)]
pub enum ClickTarget {
    Node(GraphNode),
    Edge(GraphEdge),
}

pub struct Controller {
    phase: ViewPhase,
    snapshot: GraphSnapshot,
    type_tags: Vec<String>,
    selected_tag: Option<String>,
    next_token: u64,
    latest_token: u64,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            phase: ViewPhase::Idle,
            snapshot: GraphSnapshot::default(),
            type_tags: Vec::new(),
            selected_tag: None,
            next_token: 0,
            latest_token: 0,
        }
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn type_tags(&self) -> &[String] {
        &self.type_tags
    }

    pub fn set_type_tags(&mut self, tags: Vec<String>) {
        // keep the selection if it still exists
        if let Some(sel) = &self.selected_tag
            && !tags.iter().any(|t| t == sel)
        {
            self.selected_tag = None;
        }
        self.type_tags = tags;
    }

    pub fn selected_tag(&self) -> Option<&str> {
        self.selected_tag.as_deref()
    }

    pub fn set_selected_tag(&mut self, tag: Option<String>) {
        self.selected_tag = tag;
    }

    /// Start a load cycle; the returned token must travel with the job.
    pub fn begin_load(&mut self) -> u64 {
        self.next_token += 1;
        self.latest_token = self.next_token;
        self.phase = ViewPhase::Loading;
        self.latest_token
    }

    /// Accept a finished load unless a newer one was issued meanwhile.
    /// Returns whether the snapshot was taken.
    pub fn finish_load(&mut self, token: u64, snapshot: GraphSnapshot) -> bool {
        if token < self.latest_token {
            debug!("discarding stale graph load (token {} < {})", token, self.latest_token);
            return false;
        }
        self.snapshot = snapshot;
        self.phase = ViewPhase::Rendered;
        true
    }

    /// A load failed; the previous view stays in place.
    pub fn load_failed(&mut self, token: u64) {
        if token < self.latest_token {
            return;
        }
        self.phase = if self.snapshot.is_empty() { ViewPhase::Idle } else { ViewPhase::Rendered };
    }

    /// The snapshot scoped to the current filter selection.
    pub fn filtered(&self) -> GraphSnapshot {
        self.snapshot.filter_by_type_tag(self.selected_tag.as_deref())
    }

    /// Resolve a forwarded click to the entity it names, via the snapshot's
    /// index. Returns `None` when the element vanished since the render.
    pub fn resolve_click(&self, event: &BridgeEvent) -> Option<ClickTarget> {
        match event.kind {
            ElementKind::Node => self.snapshot.node(&event.id).cloned().map(ClickTarget::Node),
            ElementKind::Edge => self.snapshot.edge(&event.id).cloned().map(ClickTarget::Edge),
        }
    }
}
