//! Multihome backend
//!
//! Every local cast is delivered on this instance first, then offered once
//! to each peer in parallel. Peer results never reach the caller's client;
//! they are logged and, for callers that care, collected in a report.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use castmesh_core::{dispatch, EventData, LocalDelivery, LocalEvent, MeshError, MeshResult, PeerIdentity};
use castmesh_transport::{serve, PeerPool, Security};

use crate::{MeshConfig, MeshStats, MeshStatsSnapshot, PeerIngress};

/// Outcome of offering one event to every peer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: Vec<PeerIdentity>,
    pub failed: Vec<(PeerIdentity, MeshError)>,
}

impl FanoutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Handle on a running fan-out. Dropping it does not cancel the fan-out.
#[derive(Debug)]
pub struct FanoutHandle(JoinHandle<FanoutReport>);

impl FanoutHandle {
    /// Wait for every peer call to finish
    pub async fn report(self) -> FanoutReport {
        match self.0.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "fan-out task did not complete");
                FanoutReport::default()
            }
        }
    }
}

/// Cluster-aware cast API for one socket server instance
pub struct MultihomeBackend {
    config: MeshConfig,
    security: Security,
    pool: Arc<PeerPool>,
    delivery: Arc<dyn LocalDelivery>,
    stats: Arc<MeshStats>,
}

impl MultihomeBackend {
    /// Validate `config`, load TLS material and open one channel per peer.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: MeshConfig, delivery: Arc<dyn LocalDelivery>) -> MeshResult<Self> {
        config.validate()?;
        let security = config.link_security()?;
        let pool = PeerPool::connect(&config.peers, &security, &config.pool_options())?;

        info!(
            peers = pool.len(),
            secure = security.is_secure(),
            listen = %config.listen_addr,
            "multihome backend ready"
        );

        Ok(MultihomeBackend {
            config,
            security,
            pool: Arc::new(pool),
            delivery,
            stats: Arc::new(MeshStats::default()),
        })
    }

    pub fn broadcast(&self, event: &str, data: EventData) -> MeshResult<FanoutHandle> {
        Ok(self.propagate(LocalEvent::broadcast(event, data)?))
    }

    pub fn roomcast(&self, room: &str, event: &str, data: EventData) -> MeshResult<FanoutHandle> {
        Ok(self.propagate(LocalEvent::roomcast(room, event, data)?))
    }

    pub fn socketcast(&self, socket_id: &str, event: &str, data: EventData) -> MeshResult<FanoutHandle> {
        Ok(self.propagate(LocalEvent::socketcast(socket_id, event, data)?))
    }

    /// Deliver `event` locally, then start offering it to every peer.
    pub fn propagate(&self, event: LocalEvent) -> FanoutHandle {
        dispatch(self.delivery.as_ref(), event.event());
        self.stats.originated();

        let pool = self.pool.clone();
        let stats = self.stats.clone();
        FanoutHandle(tokio::spawn(fan_out(pool, stats, event)))
    }

    /// Service for incoming peer calls. Holds no reference to the pool.
    pub fn ingress(&self) -> PeerIngress {
        PeerIngress::new(self.delivery.clone(), self.stats.clone())
    }

    /// Accept peer calls on `listener` until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> MeshResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        serve(listener, self.ingress(), &self.security, shutdown).await
    }

    /// Bind the configured listen address and serve on it
    pub async fn listen<F>(&self, shutdown: F) -> MeshResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| MeshError::Config(format!("cannot listen on {}: {e}", self.config.listen_addr)))?;
        self.serve(listener, shutdown).await
    }

    pub fn peers(&self) -> Vec<PeerIdentity> {
        self.pool.identities()
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn stats(&self) -> MeshStatsSnapshot {
        self.stats.snapshot()
    }
}

async fn fan_out(pool: Arc<PeerPool>, stats: Arc<MeshStats>, event: LocalEvent) -> FanoutReport {
    let event = Arc::new(event);
    let mut calls = JoinSet::new();

    for connection in pool.iter() {
        let connection = connection.clone();
        let event = event.clone();
        calls.spawn(async move {
            let result = connection.propagate(event.event()).await;
            (connection.identity().clone(), result)
        });
    }

    let mut report = FanoutReport::default();
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok((peer, Ok(()))) => {
                stats.propagation(true);
                report.delivered.push(peer);
            }
            Ok((peer, Err(err))) => {
                stats.propagation(false);
                warn!(
                    peer = %peer,
                    kind = %event.event().kind(),
                    event = event.event().name(),
                    error = %err,
                    "propagation failed"
                );
                report.failed.push((peer, err));
            }
            Err(e) => warn!(error = %e, "propagation task aborted"),
        }
    }

    report.delivered.sort();
    report.failed.sort_by(|a, b| a.0.cmp(&b.0));
    debug!(
        event = event.event().name(),
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "fan-out finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl LocalDelivery for Recorder {
        fn deliver_to_socket(&self, socket_id: &str, event: &str, _data: &EventData) {
            self.calls.lock().unwrap().push(format!("socket:{socket_id}:{event}"));
        }

        fn deliver_to_room(&self, room: &str, event: &str, _data: &EventData) {
            self.calls.lock().unwrap().push(format!("room:{room}:{event}"));
        }

        fn deliver_to_all(&self, event: &str, _data: &EventData) {
            self.calls.lock().unwrap().push(format!("all:{event}"));
        }
    }

    #[test]
    fn test_new_rejects_empty_peer_list() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let result = MultihomeBackend::new(MeshConfig::default(), Arc::new(Recorder::default()));
        assert!(result.err().unwrap().is_fatal());
    }

    #[tokio::test]
    async fn test_local_delivery_precedes_fanout() {
        let recorder = Arc::new(Recorder::default());
        // Nothing listens on port 1; the call fails but local delivery stands.
        let config = MeshConfig::default()
            .with_peers(["127.0.0.1:1"])
            .with_call_timeout(std::time::Duration::from_millis(500));
        let backend = MultihomeBackend::new(config, recorder.clone()).unwrap();

        let handle = backend.roomcast("lobby", "chat", EventData::text("hi")).unwrap();
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["room:lobby:chat"]);

        let report = handle.report().await;
        assert!(report.delivered.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.host_port(), "127.0.0.1:1");
        assert!(!report.failed[0].1.is_fatal());

        let stats = backend.stats();
        assert_eq!(stats.events_originated, 1);
        assert_eq!(stats.propagations_failed, 1);
    }

    #[tokio::test]
    async fn test_invalid_local_event_not_delivered() {
        let recorder = Arc::new(Recorder::default());
        let backend = MultihomeBackend::new(MeshConfig::default().with_peers(["127.0.0.1:1"]), recorder.clone())
            .unwrap();

        assert!(backend.broadcast("", EventData::text("x")).is_err());
        assert!(backend.socketcast("", "dm", EventData::text("x")).is_err());
        assert!(recorder.calls.lock().unwrap().is_empty());
        assert_eq!(backend.stats().events_originated, 0);
    }

    #[tokio::test]
    async fn test_duplicate_peers_collapse() {
        let config = MeshConfig::default().with_peers(["127.0.0.1:1", "127.0.0.1@127.0.0.1:1"]);
        let backend = MultihomeBackend::new(config, Arc::new(Recorder::default())).unwrap();
        assert_eq!(backend.peers().len(), 1);
    }
}
