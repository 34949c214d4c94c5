//! Peer event ingress
//!
//! Server side of `Propagate`. It holds the local delivery callback and
//! nothing else: there is no path from here back into the peer pool, so an
//! event received from a peer is never forwarded.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use castmesh_auth::TokenClaims;
use castmesh_core::{dispatch, LocalDelivery, PeerEvent};
use castmesh_wire::{to_status, Propagate, PropagateAck, PropagateRequest};

use crate::MeshStats;

/// Delivers events received from peers to local sockets
#[derive(Clone)]
pub struct PeerIngress {
    delivery: Arc<dyn LocalDelivery>,
    stats: Arc<MeshStats>,
}

impl PeerIngress {
    pub fn new(delivery: Arc<dyn LocalDelivery>, stats: Arc<MeshStats>) -> Self {
        PeerIngress { delivery, stats }
    }

    /// Hand a peer event to the local server, exactly once
    pub fn deliver(&self, event: &PeerEvent) {
        let event = event.event();
        debug!(
            kind = %event.kind(),
            target = event.target().as_str(),
            event = event.name(),
            bytes = event.data().len(),
            "delivering peer event"
        );
        dispatch(self.delivery.as_ref(), event);
        self.stats.received();
    }
}

#[tonic::async_trait]
impl Propagate for PeerIngress {
    async fn propagate(&self, request: Request<PropagateRequest>) -> Result<Response<PropagateAck>, Status> {
        let remote = request.remote_addr();
        let subject = request.extensions().get::<TokenClaims>().map(|c| c.sub.clone());

        let event = match request.into_inner().into_peer_event() {
            Ok(event) => event,
            Err(err) => {
                self.stats.rejected();
                warn!(remote = ?remote, subject = ?subject, error = %err, "rejected malformed peer event");
                return Err(to_status(&err));
            }
        };

        self.deliver(&event);
        Ok(Response::new(PropagateAck {}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castmesh_core::{EventData, LocalEvent};
    use castmesh_wire::WireCastKind;
    use std::sync::Mutex;
    use tonic::Code;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl LocalDelivery for Recorder {
        fn deliver_to_socket(&self, socket_id: &str, event: &str, _data: &EventData) {
            self.calls.lock().unwrap().push(format!("socket:{socket_id}:{event}"));
        }

        fn deliver_to_room(&self, room: &str, event: &str, data: &EventData) {
            let text = data.as_text().unwrap_or_default();
            self.calls.lock().unwrap().push(format!("room:{room}:{event}:{text}"));
        }

        fn deliver_to_all(&self, event: &str, _data: &EventData) {
            self.calls.lock().unwrap().push(format!("all:{event}"));
        }
    }

    fn ingress() -> (PeerIngress, Arc<Recorder>, Arc<MeshStats>) {
        let recorder = Arc::new(Recorder::default());
        let stats = Arc::new(MeshStats::default());
        (PeerIngress::new(recorder.clone(), stats.clone()), recorder, stats)
    }

    #[tokio::test]
    async fn test_propagate_delivers_once() {
        let (ingress, recorder, stats) = ingress();
        let event = LocalEvent::roomcast("lobby", "chat", EventData::text("hi")).unwrap();

        ingress
            .propagate(Request::new(PropagateRequest::from(event.event())))
            .await
            .unwrap();

        assert_eq!(*recorder.calls.lock().unwrap(), vec!["room:lobby:chat:hi"]);
        assert_eq!(stats.snapshot().events_received, 1);
        assert_eq!(stats.snapshot().events_originated, 0);
    }

    #[tokio::test]
    async fn test_malformed_event_rejected() {
        let (ingress, recorder, stats) = ingress();
        let request = PropagateRequest {
            cast_kind: WireCastKind::Socket as i32,
            target: String::new(),
            event_name: "dm".into(),
            payload: Default::default(),
            binary: false,
        };

        let status = ingress.propagate(Request::new(request)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(recorder.calls.lock().unwrap().is_empty());
        assert_eq!(stats.snapshot().events_rejected, 1);
    }
}
