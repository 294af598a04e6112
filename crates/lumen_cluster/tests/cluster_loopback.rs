//! End-to-end cluster verification over loopback TCP.
//!
//! Runs a real root and real node clients in separate threads, connected
//! through the actual wire codec, and checks the properties the whole
//! design exists for: every node observes the root's exact event order,
//! replicated timing is bit-identical, and a hung peer cannot stall the
//! frame barrier.

use std::net::TcpStream;
use std::thread;

use lumen_cluster::integration::{MockEventHandler, MockRenderBackend};
use lumen_cluster::{ClusterConfig, Event, NodeClient, RootServer};

fn root_config(sync_timeout_ms: u64) -> ClusterConfig {
    let mut config = ClusterConfig::default();
    config.port = 0;
    config.sync_timeout_ms = sync_timeout_ms;
    config.clock.benchmark = true;
    config
}

/// Runs a node against the given root port and returns what it observed.
fn spawn_node(port: u16) -> thread::JoinHandle<(MockRenderBackend, MockEventHandler, u64, f64)> {
    thread::spawn(move || {
        let mut config = ClusterConfig::default();
        config.port = port;
        let mut node = NodeClient::connect(&config, "127.0.0.1").unwrap();
        let mut backend = MockRenderBackend::new();
        let mut handler = MockEventHandler::new();
        node.run(&mut backend, &mut handler).unwrap();
        let clock = node.session().clock();
        (backend, handler, clock.frame(), clock.dt())
    })
}

#[test]
fn test_nodes_replicate_the_roots_event_order() {
    let mut root = RootServer::bind(&root_config(2_000)).unwrap();
    let port = root.port();

    let node_a = spawn_node(port);
    let node_b = spawn_node(port);
    while root.node_count() < 2 {
        root.poll_admissions().unwrap();
    }

    let mut backend = MockRenderBackend::new();
    let mut handler = MockEventHandler::new();
    for frame in 1..=3u64 {
        let inputs = [Event::user(frame), Event::click(0, 0, true)];
        assert!(root.step(&inputs, &mut backend, &mut handler).unwrap());
    }
    assert_eq!(root.node_count(), 2);
    root.close(&mut backend, &mut handler).unwrap();

    let (backend_a, handler_a, frames_a, dt_a) = node_a.join().unwrap();
    let (backend_b, handler_b, frames_b, dt_b) = node_b.join().unwrap();

    // Both nodes saw exactly what the root dispatched locally, in order.
    assert_eq!(handler_a.events, handler.events);
    assert_eq!(handler_a.events, handler_b.events);
    assert_eq!(handler_a.events[0], Event::user(1));
    assert!(matches!(handler_a.events[2], Event::Tick { .. }));
    assert_eq!(*handler_a.events.last().unwrap(), Event::Close);

    // Replicated timing is bit-identical to the root's.
    assert_eq!(frames_a, 3);
    assert_eq!(frames_b, 3);
    assert_eq!(dt_a, root.session().clock().dt());
    assert_eq!(dt_a, dt_b);

    // One presented frame per Swap, on every display process.
    assert_eq!(backend_a.swaps, 3);
    assert_eq!(backend_b.swaps, 3);
    assert_eq!(backend_a.draws.len(), 3);
}

#[test]
fn test_hung_peer_cannot_stall_the_barrier() {
    let mut root = RootServer::bind(&root_config(200)).unwrap();
    let port = root.port();

    // One well-behaved node and one peer that never acknowledges.
    let node = spawn_node(port);
    let _silent = TcpStream::connect(("127.0.0.1", port)).unwrap();
    while root.node_count() < 2 {
        root.poll_admissions().unwrap();
    }

    let mut backend = MockRenderBackend::new();
    let mut handler = MockEventHandler::new();
    assert!(root.step(&[], &mut backend, &mut handler).unwrap());

    // The silent peer was dropped at the barrier; the cluster advanced.
    assert_eq!(root.node_count(), 1);
    assert_eq!(backend.swaps, 1);

    root.close(&mut backend, &mut handler).unwrap();
    let (node_backend, _, frames, _) = node.join().unwrap();
    assert_eq!(node_backend.swaps, 1);
    assert_eq!(frames, 1);
}

#[test]
fn test_standalone_root_needs_no_nodes() {
    let mut root = RootServer::bind(&root_config(100)).unwrap();
    let mut backend = MockRenderBackend::new();
    let mut handler = MockEventHandler::new();

    for _ in 0..5 {
        assert!(root.step(&[], &mut backend, &mut handler).unwrap());
    }
    root.close(&mut backend, &mut handler).unwrap();

    assert_eq!(backend.swaps, 5);
    assert_eq!(root.session().clock().frame(), 5);
}
