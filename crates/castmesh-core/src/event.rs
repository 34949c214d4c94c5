//! Propagated events
//!
//! An event is a named payload aimed at one cast target. Events come in two
//! origins that never convert into each other:
//! - [`LocalEvent`]: emitted on this instance, offered to every peer
//! - [`PeerEvent`]: received from a peer, delivered locally only

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::{MeshError, MeshResult};

/// Fan-out target category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// A single socket
    Socket,
    /// Every member of a named room
    Room,
    /// Every connection
    Broadcast,
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CastKind::Socket => "socketcast",
            CastKind::Room => "roomcast",
            CastKind::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// Where an event goes. Socket and room targets are never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CastTarget {
    Socket(String),
    Room(String),
    Broadcast,
}

impl CastTarget {
    pub fn socket(id: impl Into<String>) -> MeshResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(MeshError::InvalidEvent("socketcast requires a socket id".into()));
        }
        Ok(CastTarget::Socket(id))
    }

    pub fn room(name: impl Into<String>) -> MeshResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MeshError::InvalidEvent("roomcast requires a room name".into()));
        }
        Ok(CastTarget::Room(name))
    }

    /// Rebuild a target from its wire form (kind + possibly empty string)
    pub fn from_parts(kind: CastKind, target: String) -> MeshResult<Self> {
        match kind {
            CastKind::Socket => CastTarget::socket(target),
            CastKind::Room => CastTarget::room(target),
            CastKind::Broadcast if target.is_empty() => Ok(CastTarget::Broadcast),
            CastKind::Broadcast => Err(MeshError::InvalidEvent(format!(
                "broadcast must not carry a target, got '{target}'"
            ))),
        }
    }

    pub fn kind(&self) -> CastKind {
        match self {
            CastTarget::Socket(_) => CastKind::Socket,
            CastTarget::Room(_) => CastKind::Room,
            CastTarget::Broadcast => CastKind::Broadcast,
        }
    }

    /// Socket id or room name; empty for broadcast
    pub fn as_str(&self) -> &str {
        match self {
            CastTarget::Socket(s) | CastTarget::Room(s) => s,
            CastTarget::Broadcast => "",
        }
    }
}

/// Event payload as the socket server emits it
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct EventData {
    pub payload: Bytes,
    /// Binary payloads are emitted as binary frames, the rest as text
    pub binary: bool,
}

impl EventData {
    pub fn text(text: impl Into<String>) -> Self {
        EventData {
            payload: Bytes::from(text.into()),
            binary: false,
        }
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        EventData {
            payload: bytes.into(),
            binary: true,
        }
    }

    /// JSON-encode a value into a text payload
    pub fn json<T: Serialize + ?Sized>(value: &T) -> MeshResult<Self> {
        let encoded = serde_json::to_vec(value)
            .map_err(|e| MeshError::InvalidEvent(format!("payload is not serializable: {e}")))?;
        Ok(EventData {
            payload: Bytes::from(encoded),
            binary: false,
        })
    }

    /// Payload as UTF-8, if this is a text payload
    pub fn as_text(&self) -> Option<&str> {
        if self.binary {
            return None;
        }
        std::str::from_utf8(&self.payload).ok()
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// An event as it travels between instances
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropagatedEvent {
    target: CastTarget,
    name: String,
    data: EventData,
}

impl PropagatedEvent {
    pub fn new(target: CastTarget, name: impl Into<String>, data: EventData) -> MeshResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MeshError::InvalidEvent("event name must not be empty".into()));
        }
        Ok(PropagatedEvent { target, name, data })
    }

    pub fn target(&self) -> &CastTarget {
        &self.target
    }

    pub fn kind(&self) -> CastKind {
        self.target.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }
}

/// Event that originated on this instance and may be propagated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalEvent(PropagatedEvent);

impl LocalEvent {
    pub fn broadcast(name: impl Into<String>, data: EventData) -> MeshResult<Self> {
        PropagatedEvent::new(CastTarget::Broadcast, name, data).map(LocalEvent)
    }

    pub fn roomcast(room: impl Into<String>, name: impl Into<String>, data: EventData) -> MeshResult<Self> {
        PropagatedEvent::new(CastTarget::room(room)?, name, data).map(LocalEvent)
    }

    pub fn socketcast(
        socket_id: impl Into<String>,
        name: impl Into<String>,
        data: EventData,
    ) -> MeshResult<Self> {
        PropagatedEvent::new(CastTarget::socket(socket_id)?, name, data).map(LocalEvent)
    }

    pub fn event(&self) -> &PropagatedEvent {
        &self.0
    }
}

/// Event received from a peer; delivery-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerEvent(PropagatedEvent);

impl PeerEvent {
    /// Wrap an event decoded from the wire
    pub fn received(event: PropagatedEvent) -> Self {
        PeerEvent(event)
    }

    pub fn event(&self) -> &PropagatedEvent {
        &self.0
    }
}
