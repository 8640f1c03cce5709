//! Actix-web server backing the rendered view: serves the current document on
//! `/` and receives click events on `/bridge/click`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::{info, warn};
use serde::Deserialize;
use tokio::runtime::Runtime;

use super::{event_sender, BridgeEvent, ElementKind};
use crate::persistence::settings::AppSettings;

// Store server state for stop/restart
struct ServerState {
    handle: Option<actix_web::dev::ServerHandle>,
    runtime: Option<Runtime>,
}

static SERVER_STATE: once_cell::sync::Lazy<Arc<Mutex<ServerState>>> =
    once_cell::sync::Lazy::new(|| {
        Arc::new(Mutex::new(ServerState { handle: None, runtime: None }))
    });

#[derive(Clone)]
struct Cfg {
    document_path: PathBuf,
}

#[derive(Deserialize)]
struct ClickBody {
    kind: String,
    id: String,
}

async fn serve_document(cfg: web::Data<Cfg>) -> impl Responder {
    match std::fs::read_to_string(&cfg.document_path) {
        Ok(html) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(e) => HttpResponse::NotFound().body(format!("no rendered graph yet: {}", e)),
    }
}

async fn handle_click(body: web::Json<ClickBody>) -> impl Responder {
    let Some(kind) = ElementKind::parse(&body.kind) else {
        return HttpResponse::BadRequest().body("unknown element kind");
    };
    let Some(tx) = event_sender() else {
        return HttpResponse::ServiceUnavailable().body("broker not ready");
    };
    if tx.send(BridgeEvent { kind, id: body.id.clone() }).is_err() {
        warn!("bridge click dropped, event channel closed");
        return HttpResponse::ServiceUnavailable().body("event channel closed");
    }
    HttpResponse::Ok().body("ok")
}

pub fn start_server(cfg: &AppSettings, document_path: PathBuf) -> anyhow::Result<()> {
    let bind = cfg.bridge_endpoint();
    stop_server();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[Graph-Atlas] Failed to create tokio runtime for bridge: {}", e);
                return;
            }
        };

        rt.block_on(async move {
            let cfg_data = Cfg { document_path };
            info!("bridge server starting on {}", bind);
            let server = match HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(cfg_data.clone()))
                    .route("/", web::get().to(serve_document))
                    .route("/bridge/click", web::post().to(handle_click))
            })
            .bind(&bind)
            {
                Ok(s) => s.run(),
                Err(e) => {
                    eprintln!("[Graph-Atlas] bridge server bind failed on {}: {}", bind, e);
                    return;
                }
            };
            {
                let mut st = SERVER_STATE.lock().unwrap();
                st.handle = Some(server.handle());
            }
            let _ = server.await;
        });
        {
            let mut st = SERVER_STATE.lock().unwrap();
            st.runtime = Some(rt);
        }
    });
    Ok(())
}

pub fn stop_server() {
    let (handle, rt) = {
        let mut st = SERVER_STATE.lock().unwrap();
        (st.handle.take(), st.runtime.take())
    };
    if let Some(h) = handle {
        let _ = h.stop(false);
    }
    if let Some(r) = rt {
        r.shutdown_timeout(Duration::from_millis(100));
    }
}

#[allow(dead_code)]
pub fn is_running() -> bool {
    SERVER_STATE.lock().unwrap().handle.is_some()
}
