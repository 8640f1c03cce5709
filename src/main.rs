use eframe::egui;
use log::{error, warn};

use graph_atlas::bridge;
use graph_atlas::gui::frontend::AtlasApp;
use graph_atlas::persistence::settings::AppSettings;
use graph_atlas::worker::{StoreBackend, StoreWorker};

fn main() -> eframe::Result {
    env_logger::init();

    let settings = AppSettings::load().unwrap_or_else(|e| {
        warn!("failed to load settings, using defaults: {}", e);
        AppSettings::default()
    });

    // Bridge broker first so the server can forward clicks as soon as it is up
    let bridge_rx = bridge::init_broker();
    if let Err(e) = bridge::server::start_server(&settings, settings.live_document_path()) {
        error!("bridge server failed to start: {}", e);
    }

    // The worker owns the runtime and the driver; the handshake happens there
    let (worker, outcomes) = StoreWorker::spawn(StoreBackend::Neo4j(settings.neo4j_config()));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 680.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([640.0, 400.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Graph-Atlas",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(AtlasApp::new(settings, worker, outcomes, bridge_rx)) as Box<dyn eframe::App>)
        }),
    )
}
