//! Three instances on loopback, insecure links

mod common;

use std::time::Duration;

use castmesh_core::{ErrorKind, EventData};
use castmesh_runtime::MeshConfig;

use common::{bind, free_addr, Node, Registry};

fn config(peers: &[std::net::SocketAddr]) -> MeshConfig {
    MeshConfig::default()
        .with_peers(peers.iter().map(|addr| addr.to_string()))
        .with_call_timeout(Duration::from_secs(2))
}

async fn cluster() -> (Node, Node, Node) {
    let (la, a) = bind().await;
    let (lb, b) = bind().await;
    let (lc, c) = bind().await;

    let node_a = Node::start(la, config(&[b, c]), Registry::with_socket("sa", &["lobby"]));
    let node_b = Node::start(lb, config(&[a, c]), Registry::with_socket("sb", &["lobby"]));
    let node_c = Node::start(lc, config(&[a, b]), Registry::with_socket("sc", &["lobby", "ops"]));
    (node_a, node_b, node_c)
}

#[tokio::test]
async fn test_roomcast_reaches_every_instance_once() {
    let (a, b, c) = cluster().await;

    let report = a
        .backend
        .roomcast("lobby", "chat", EventData::text("hi"))
        .unwrap()
        .report()
        .await;
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(report.delivered.len(), 2);

    for (node, socket) in [(&a, "sa"), (&b, "sb"), (&c, "sc")] {
        let inbox = node.registry.inbox();
        assert_eq!(inbox.len(), 1, "{socket} got {inbox:?}");
        assert_eq!(inbox[0].socket, socket);
        assert_eq!(inbox[0].event, "chat");
        assert_eq!(inbox[0].data.as_text(), Some("hi"));
    }

    // Receivers deliver only; they never originate or forward.
    for node in [&b, &c] {
        let stats = node.backend.stats();
        assert_eq!(stats.events_received, 1);
        assert_eq!(stats.events_originated, 0);
        assert_eq!(stats.propagations_ok + stats.propagations_failed, 0);
    }
    assert_eq!(a.backend.stats().propagations_ok, 2);

    a.stop().await;
    b.stop().await;
    c.stop().await;
}

#[tokio::test]
async fn test_broadcast_binary_payload() {
    let (a, b, c) = cluster().await;

    let report = b
        .backend
        .broadcast("blob", EventData::binary(vec![0u8, 159, 255]))
        .unwrap()
        .report()
        .await;
    assert!(report.is_complete());

    for node in [&a, &b, &c] {
        let inbox = node.registry.inbox();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].data.binary);
        assert_eq!(&inbox[0].data.payload[..], &[0u8, 159, 255]);
    }

    a.stop().await;
    b.stop().await;
    c.stop().await;
}

#[tokio::test]
async fn test_socketcast_to_absent_socket_is_noop() {
    let (a, b, c) = cluster().await;

    let report = a
        .backend
        .socketcast("sc", "dm", EventData::text("psst"))
        .unwrap()
        .report()
        .await;
    assert!(report.is_complete());
    assert!(a.registry.inbox().is_empty());
    assert!(b.registry.inbox().is_empty());
    assert_eq!(c.registry.inbox().len(), 1);

    let report = a
        .backend
        .socketcast("nobody", "dm", EventData::text("psst"))
        .unwrap()
        .report()
        .await;
    assert!(report.is_complete());
    assert_eq!(c.registry.inbox().len(), 1);
    assert_eq!(b.backend.stats().events_received, 2);

    a.stop().await;
    b.stop().await;
    c.stop().await;
}

#[tokio::test]
async fn test_unreachable_peer_does_not_block_others() {
    let (la, _) = bind().await;
    let (lc, c_addr) = bind().await;
    let down = free_addr().await;

    let a = Node::start(la, config(&[down, c_addr]), Registry::with_socket("sa", &["ops"]));
    let c = Node::start(lc, config(&[down]), Registry::with_socket("sc", &["ops"]));

    let report = a
        .backend
        .roomcast("ops", "alert", EventData::json(&["disk", "full"]).unwrap())
        .unwrap()
        .report()
        .await;

    assert_eq!(report.delivered.len(), 1);
    assert_eq!(report.delivered[0].host_port(), c_addr.to_string());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.host_port(), down.to_string());
    assert_eq!(report.failed[0].1.kind(), ErrorKind::Transport);

    assert_eq!(a.registry.inbox().len(), 1);
    assert_eq!(c.registry.inbox()[0].data.as_text(), Some(r#"["disk","full"]"#));

    let stats = a.backend.stats();
    assert_eq!(stats.propagations_ok, 1);
    assert_eq!(stats.propagations_failed, 1);

    a.stop().await;
    c.stop().await;
}
