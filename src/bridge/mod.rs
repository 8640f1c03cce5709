use once_cell::sync::OnceCell;
use std::sync::mpsc::{Receiver, Sender};

// Global sender the HTTP handlers use to forward clicks into the GUI thread
static BRIDGE_TX: OnceCell<Sender<BridgeEvent>> = OnceCell::new();

/// Which kind of rendered element was clicked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

impl ElementKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "node" => Some(ElementKind::Node),
            "edge" => Some(ElementKind::Edge),
            _ => None,
        }
    }
}

/// The only inbound signal from the rendered page: element kind plus id.
#[derive(Clone, Debug)]
pub struct BridgeEvent {
    pub kind: ElementKind,
    pub id: String,
}

pub fn set_event_sender(tx: Sender<BridgeEvent>) {
    let _ = BRIDGE_TX.set(tx);
}

pub fn event_sender() -> Option<&'static Sender<BridgeEvent>> {
    BRIDGE_TX.get()
}

// Called by the GUI at startup to create the broker pair
pub fn init_broker() -> Receiver<BridgeEvent> {
    let (tx, rx) = std::sync::mpsc::channel();
    set_event_sender(tx);
    rx
}

// Server lifecycle API (feature-gated). Non-bridge builds get no-op stubs.
#[cfg(feature = "bridge")]
pub mod server;

#[cfg(not(feature = "bridge"))]
pub mod server {
    use std::path::PathBuf;

    use crate::persistence::settings::AppSettings;

    pub fn start_server(_cfg: &AppSettings, _document_path: PathBuf) -> anyhow::Result<()> {
        Ok(())
    }
    pub fn stop_server() {}
    pub fn is_running() -> bool {
        false
    }
}
