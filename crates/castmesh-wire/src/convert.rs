//! Conversions between core events and wire messages

use castmesh_core::{CastKind, CastTarget, EventData, MeshError, MeshResult, PeerEvent, PropagatedEvent};

use crate::pb::{PropagateRequest, WireCastKind};

impl From<CastKind> for WireCastKind {
    fn from(kind: CastKind) -> Self {
        match kind {
            CastKind::Socket => WireCastKind::Socket,
            CastKind::Room => WireCastKind::Room,
            CastKind::Broadcast => WireCastKind::Broadcast,
        }
    }
}

impl From<&PropagatedEvent> for PropagateRequest {
    fn from(event: &PropagatedEvent) -> Self {
        PropagateRequest {
            cast_kind: WireCastKind::from(event.kind()) as i32,
            target: event.target().as_str().to_string(),
            event_name: event.name().to_string(),
            payload: event.data().payload.clone(),
            binary: event.data().binary,
        }
    }
}

impl PropagateRequest {
    /// Decode a received request. The result can only be delivered locally.
    pub fn into_peer_event(self) -> MeshResult<PeerEvent> {
        let kind = match WireCastKind::try_from(self.cast_kind) {
            Ok(WireCastKind::Socket) => CastKind::Socket,
            Ok(WireCastKind::Room) => CastKind::Room,
            Ok(WireCastKind::Broadcast) => CastKind::Broadcast,
            Ok(WireCastKind::Unspecified) | Err(_) => {
                return Err(MeshError::InvalidEvent(format!(
                    "unknown cast kind {}",
                    self.cast_kind
                )))
            }
        };

        let target = CastTarget::from_parts(kind, self.target)?;
        let data = EventData {
            payload: self.payload,
            binary: self.binary,
        };
        PropagatedEvent::new(target, self.event_name, data).map(PeerEvent::received)
    }
}
