//! Local delivery contract
//!
//! Implemented by the socket server that owns the local socket and room
//! registry. The mesh calls it for locally originated events and for events
//! received from peers alike, so a socket behaves the same wherever it lives.

use crate::{CastTarget, EventData, PropagatedEvent};

/// Callback into the local socket server
pub trait LocalDelivery: Send + Sync + 'static {
    /// Deliver to one socket. An unknown id is a silent no-op: the socket
    /// may live on another instance or have disconnected.
    fn deliver_to_socket(&self, socket_id: &str, event: &str, data: &EventData);

    /// Deliver to every local member of `room`
    fn deliver_to_room(&self, room: &str, event: &str, data: &EventData);

    /// Deliver to every local socket
    fn deliver_to_all(&self, event: &str, data: &EventData);
}

/// Route an event to the matching delivery call
pub fn dispatch(delivery: &dyn LocalDelivery, event: &PropagatedEvent) {
    match event.target() {
        CastTarget::Socket(id) => delivery.deliver_to_socket(id, event.name(), event.data()),
        CastTarget::Room(room) => delivery.deliver_to_room(room, event.name(), event.data()),
        CastTarget::Broadcast => delivery.deliver_to_all(event.name(), event.data()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalEvent;
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
    fn test_dispatch_routes_by_kind() {
        let recorder = Recorder::default();
        let data = EventData::text("x");

        dispatch(&recorder, LocalEvent::socketcast("s1", "ping", data.clone()).unwrap().event());
        dispatch(&recorder, LocalEvent::roomcast("lobby", "chat", data.clone()).unwrap().event());
        dispatch(&recorder, LocalEvent::broadcast("news", data).unwrap().event());

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["socket:s1:ping", "room:lobby:chat", "all:news"]
        );
    }
}
