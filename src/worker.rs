//! Store worker: a background thread with its own tokio runtime that runs
//! every store call off the UI thread and marshals results back over a
//! channel. Jobs always run to completion; there is no cancellation and no
//! timeout. Load jobs carry a monotonically increasing token so the UI can
//! discard results that arrive after a newer load was issued.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use log::{error, warn};

use crate::graph_utils::graph::{EdgeDirection, GraphEdge, GraphNode, GraphSnapshot, PropertyMap};
use crate::store::memory::MemoryStore;
use crate::store::neo4j::{Neo4jConfig, Neo4jStore};
use crate::store::{GraphStore, StoreError};

/// Which store the worker connects to at startup.
pub enum StoreBackend {
    Neo4j(Neo4jConfig),
    Memory,
}

/// Unit of work submitted to the worker.
pub enum StoreJob {
    LoadGraph {
        token: u64,
    },
    LoadTypeTags,
    AddNode {
        label: String,
        properties: PropertyMap,
    },
    AddRelationship {
        from: String,
        to: String,
        rel_type: String,
        direction: EdgeDirection,
        properties: PropertyMap,
    },
    UpdateNodeProperties {
        id: String,
        properties: PropertyMap,
    },
    UpdateRelationshipProperties {
        id: String,
        properties: PropertyMap,
    },
}

/// Result of one job, sent back to the UI thread before any state changes.
pub enum StoreOutcome {
    /// First message after spawn: `Err` means the Neo4j handshake failed and
    /// the worker fell back to an empty in-memory store.
    Connected(Result<(), StoreError>),
    GraphLoaded {
        token: u64,
        result: Result<GraphSnapshot, StoreError>,
    },
    TypeTagsLoaded(Result<Vec<String>, StoreError>),
    NodeAdded(Result<GraphNode, StoreError>),
    RelationshipAdded(Result<GraphEdge, StoreError>),
    NodeUpdated(Result<(), StoreError>),
    RelationshipUpdated(Result<(), StoreError>),
}

pub struct StoreWorker {
    jobs: Sender<StoreJob>,
}

impl StoreWorker {
    /// Spawn the worker thread. Connection happens inside the worker's own
    /// runtime so the driver's sockets live and die with it.
    pub fn spawn(backend: StoreBackend) -> (StoreWorker, Receiver<StoreOutcome>) {
        let (job_tx, job_rx) = channel::<StoreJob>();
        let (out_tx, out_rx) = channel::<StoreOutcome>();

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
            {
                Ok(r) => r,
                Err(e) => {
                    error!("failed to create tokio runtime for store worker: {}", e);
                    return;
                }
            };

            let store: Arc<dyn GraphStore> = match backend {
                StoreBackend::Memory => {
                    let _ = out_tx.send(StoreOutcome::Connected(Ok(())));
                    Arc::new(MemoryStore::new())
                }
                StoreBackend::Neo4j(cfg) => match rt.block_on(Neo4jStore::connect(&cfg)) {
                    Ok(s) => {
                        let _ = out_tx.send(StoreOutcome::Connected(Ok(())));
                        Arc::new(s)
                    }
                    Err(e) => {
                        warn!("neo4j connection failed, falling back to in-memory store: {}", e);
                        let _ = out_tx.send(StoreOutcome::Connected(Err(e)));
                        Arc::new(MemoryStore::new())
                    }
                },
            };

            while let Ok(job) = job_rx.recv() {
                let outcome = rt.block_on(run_job(store.as_ref(), job));
                if out_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        (StoreWorker { jobs: job_tx }, out_rx)
    }

    /// Enqueue a job. Returns false when the worker thread is gone.
    pub fn submit(&self, job: StoreJob) -> bool {
        self.jobs.send(job).is_ok()
    }
}

async fn run_job(store: &dyn GraphStore, job: StoreJob) -> StoreOutcome {
    match job {
        StoreJob::LoadGraph { token } => StoreOutcome::GraphLoaded {
            token,
            result: store.get_graph().await,
        },
        StoreJob::LoadTypeTags => StoreOutcome::TypeTagsLoaded(store.list_type_tags().await),
        StoreJob::AddNode { label, properties } => {
            StoreOutcome::NodeAdded(store.add_node(&label, properties).await)
        }
        StoreJob::AddRelationship { from, to, rel_type, direction, properties } => {
            StoreOutcome::RelationshipAdded(
                store
                    .add_relationship(&from, &to, &rel_type, direction, properties)
                    .await,
            )
        }
        StoreJob::UpdateNodeProperties { id, properties } => {
            StoreOutcome::NodeUpdated(store.update_node_properties(&id, properties).await)
        }
        StoreJob::UpdateRelationshipProperties { id, properties } => {
            StoreOutcome::RelationshipUpdated(
                store.update_relationship_properties(&id, properties).await,
            )
        }
    }
}
