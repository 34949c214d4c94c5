//! Shared helpers for in-process mesh tests

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use castmesh_core::{EventData, LocalDelivery, MeshResult};
use castmesh_runtime::{MeshConfig, MultihomeBackend};

/// Socket registry of one test instance
#[derive(Default)]
pub struct Registry {
    rooms: Mutex<HashMap<String, BTreeSet<String>>>,
    sockets: Mutex<BTreeSet<String>>,
    inbox: Mutex<Vec<Delivery>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub socket: String,
    pub event: String,
    pub data: EventData,
}

impl Registry {
    pub fn with_socket(socket: &str, rooms: &[&str]) -> Arc<Self> {
        let registry = Registry::default();
        registry.sockets.lock().unwrap().insert(socket.to_string());
        for room in rooms {
            registry
                .rooms
                .lock()
                .unwrap()
                .entry(room.to_string())
                .or_default()
                .insert(socket.to_string());
        }
        Arc::new(registry)
    }

    pub fn inbox(&self) -> Vec<Delivery> {
        self.inbox.lock().unwrap().clone()
    }

    fn push(&self, socket: &str, event: &str, data: &EventData) {
        self.inbox.lock().unwrap().push(Delivery {
            socket: socket.to_string(),
            event: event.to_string(),
            data: data.clone(),
        });
    }
}

impl LocalDelivery for Registry {
    fn deliver_to_socket(&self, socket_id: &str, event: &str, data: &EventData) {
        if self.sockets.lock().unwrap().contains(socket_id) {
            self.push(socket_id, event, data);
        }
    }

    fn deliver_to_room(&self, room: &str, event: &str, data: &EventData) {
        let members = self.rooms.lock().unwrap().get(room).cloned().unwrap_or_default();
        for socket in members {
            self.push(&socket, event, data);
        }
    }

    fn deliver_to_all(&self, event: &str, data: &EventData) {
        let sockets = self.sockets.lock().unwrap().clone();
        for socket in sockets {
            self.push(&socket, event, data);
        }
    }
}

pub async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A loopback address nothing listens on
pub async fn free_addr() -> SocketAddr {
    let (listener, addr) = bind().await;
    drop(listener);
    addr
}

/// One running instance: backend, registry and its listener task
pub struct Node {
    pub backend: Arc<MultihomeBackend>,
    pub registry: Arc<Registry>,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<MeshResult<()>>,
}

impl Node {
    pub fn start(listener: TcpListener, config: MeshConfig, registry: Arc<Registry>) -> Node {
        let backend = Arc::new(MultihomeBackend::new(config, registry.clone()).unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let server = {
            let backend = backend.clone();
            tokio::spawn(async move {
                backend
                    .serve(listener, async move {
                        let _ = rx.await;
                    })
                    .await
            })
        };
        Node {
            backend,
            registry,
            shutdown: Some(tx),
            server,
        }
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.server.await.unwrap().unwrap();
    }
}
