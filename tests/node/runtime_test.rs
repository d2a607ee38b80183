// Node Runtime Tests
// End-to-end tests of running nodes over the simulated network

use epimesh::node::{Node, NodeError, NodeHandle, Variant};
use epimesh::store::MessageId;
use epimesh::sync::{
    AntiEntropyConfig, AntiEntropyEngine, Message, PeerRegistry, RumorConfig, RumorEngine,
    SyncRequest,
};
use async_trait::async_trait;
use epimesh::transport::{MemoryNetwork, PeerAddress, Transport, TransportError, TransportStats};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const DEADLINE: Duration = Duration::from_secs(5);

fn peer(port: u16) -> PeerAddress {
    PeerAddress::new("localhost", port).unwrap()
}

fn others(port: u16, ports: &[u16]) -> PeerRegistry {
    PeerRegistry::from_peers(ports.iter().filter(|&&p| p != port).map(|&p| peer(p)))
}

fn spawn_anti_entropy(
    network: &MemoryNetwork,
    port: u16,
    peers: PeerRegistry,
    config: AntiEntropyConfig,
) -> (NodeHandle, JoinHandle<AntiEntropyEngine>) {
    let engine = AntiEntropyEngine::new(port, peers, config, StdRng::seed_from_u64(port as u64));
    Node::new(engine, network.bind(peer(port))).spawn()
}

fn spawn_rumor(
    network: &MemoryNetwork,
    port: u16,
    peers: PeerRegistry,
) -> (NodeHandle, JoinHandle<RumorEngine>) {
    let rng = StdRng::seed_from_u64(port as u64);
    let engine = RumorEngine::new(port, peers, RumorConfig::default(), rng);
    Node::new(engine, network.bind(peer(port))).spawn()
}

fn fast_rounds() -> AntiEntropyConfig {
    AntiEntropyConfig::new().with_sync_interval(Duration::from_millis(20))
}

/// Poll until the node stores `id`, or give up at the deadline
async fn wait_for_message(handle: &NodeHandle, id: &MessageId) -> Option<String> {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        let messages = handle.list_messages().await.unwrap();
        if let Some((_, text)) = messages.into_iter().find(|(m, _)| m == id) {
            return Some(text);
        }
        sleep(Duration::from_millis(10)).await;
    }
    None
}

// ============================================================================
// ANTI-ENTROPY NODES
// ============================================================================

#[tokio::test]
async fn test_three_anti_entropy_nodes_replicate() {
    let network = MemoryNetwork::new();
    let ports = [5000, 5001, 5002];
    let nodes: Vec<_> = ports
        .iter()
        .map(|&p| spawn_anti_entropy(&network, p, others(p, &ports), fast_rounds()))
        .collect();

    let id = nodes[0].0.originate("hello").await.unwrap();

    assert_eq!(id.origin_port(), Some(5000));
    for (handle, _) in &nodes[1..] {
        assert_eq!(wait_for_message(handle, &id).await.as_deref(), Some("hello"));
    }
}

#[tokio::test]
async fn test_anti_entropy_converges_over_lossy_network() {
    let network = MemoryNetwork::new().with_loss_rate(0.3).with_seed(4);
    let ports = [5000, 5001, 5002, 5003];
    let nodes: Vec<_> = ports
        .iter()
        .map(|&p| spawn_anti_entropy(&network, p, others(p, &ports), fast_rounds()))
        .collect();

    let a = nodes[0].0.originate("first").await.unwrap();
    let b = nodes[3].0.originate("second").await.unwrap();

    for (handle, _) in &nodes {
        assert!(wait_for_message(handle, &a).await.is_some());
        assert!(wait_for_message(handle, &b).await.is_some());
    }
    assert!(network.wire_log().iter().any(|r| !r.delivered));
}

#[tokio::test]
async fn test_broadcast_on_originate_skips_waiting_for_rounds() {
    let network = MemoryNetwork::new();
    let slow = AntiEntropyConfig::new()
        .with_sync_interval(Duration::from_secs(3600))
        .with_broadcast_on_originate(true);
    let (a, _ta) = spawn_anti_entropy(&network, 5000, others(5000, &[5000, 5001]), slow.clone());
    let (b, _tb) = spawn_anti_entropy(&network, 5001, others(5001, &[5000, 5001]), slow);

    let id = a.originate("pushed").await.unwrap();

    assert_eq!(wait_for_message(&b, &id).await.as_deref(), Some("pushed"));
}

#[tokio::test]
async fn test_deleted_message_comes_back() {
    let network = MemoryNetwork::new();
    let ports = [5000, 5001];
    let (a, _ta) = spawn_anti_entropy(&network, 5000, others(5000, &ports), fast_rounds());
    let (b, _tb) = spawn_anti_entropy(&network, 5001, others(5001, &ports), fast_rounds());

    let id = a.originate("sticky").await.unwrap();
    assert!(wait_for_message(&b, &id).await.is_some());

    assert!(b.delete_message(id.as_str()).await.unwrap());
    assert!(!b.delete_message(id.as_str()).await.unwrap());

    assert!(wait_for_message(&b, &id).await.is_some());
}

#[tokio::test]
async fn test_node_survives_garbage_and_answers_next_request() {
    let network = MemoryNetwork::new();
    let quiet = AntiEntropyConfig::new().with_sync_interval(Duration::from_secs(3600));
    let (node, _task) = spawn_anti_entropy(&network, 5000, PeerRegistry::new(), quiet);
    let stranger = network.bind(peer(6000));

    let id = node.originate("kept").await.unwrap();

    stranger.send_to(&peer(5000), b"{\"type\":\"sync_req").await.unwrap();
    stranger.send_to(&peer(5000), b"\xff\xfe").await.unwrap();
    stranger.send_to(&peer(5000), b"{\"type\":\"unknown\"}").await.unwrap();
    let request = Message::SyncRequest(SyncRequest::default()).to_bytes();
    stranger.send_to(&peer(5000), &request).await.unwrap();

    let (payload, from) = timeout(DEADLINE, stranger.recv_from()).await.unwrap().unwrap();
    assert_eq!(from, peer(5000));
    match Message::from_bytes(&payload).unwrap() {
        Message::SyncResponse(response) => {
            assert_eq!(response.len(), 1);
            assert_eq!(response.messages().get(&id).map(String::as_str), Some("kept"));
        }
        other => panic!("expected sync_response, got {:?}", other),
    }
    assert_eq!(node.list_messages().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_rounds_without_peers() {
    let network = MemoryNetwork::new();
    let (node, _task) = spawn_anti_entropy(&network, 5000, PeerRegistry::new(), fast_rounds());

    sleep(Duration::from_millis(100)).await;

    assert!(network.wire_log().is_empty());
    assert!(node.list_peers().await.unwrap().is_empty());
}

// ============================================================================
// RUMOR NODES
// ============================================================================

#[tokio::test]
async fn test_three_rumor_nodes_spread_with_bounded_sends() {
    let network = MemoryNetwork::new();
    let ports = [4000, 4001, 4002];
    let mut nodes: Vec<_> = ports
        .iter()
        .map(|&p| spawn_rumor(&network, p, others(p, &ports)))
        .collect();

    let id = nodes[0].0.originate("x").await.unwrap();

    let start = Instant::now();
    while network.wire_log().len() < 4 && start.elapsed() < DEADLINE {
        sleep(Duration::from_millis(10)).await;
    }
    sleep(Duration::from_millis(100)).await;
    assert_eq!(network.wire_log().len(), 4);

    let mut engines = Vec::new();
    for (handle, task) in nodes.drain(..) {
        drop(handle);
        engines.push(task.await.unwrap());
    }
    for engine in &engines {
        assert!(engine.has_seen(&id));
    }
    assert_eq!(engines[0].stats().rumors_forwarded, 2);
}

#[tokio::test]
async fn test_rumor_node_rejects_message_commands() {
    let network = MemoryNetwork::new();
    let (node, _task) = spawn_rumor(&network, 4000, PeerRegistry::new());

    assert_eq!(node.variant(), Variant::Rumor);
    assert_eq!(
        node.list_messages().await,
        Err(NodeError::Unsupported {
            operation: "list messages",
            variant: Variant::Rumor
        })
    );
    assert!(matches!(
        node.delete_message("4000-1").await,
        Err(NodeError::Unsupported { .. })
    ));
}

// ============================================================================
// PEER MANAGEMENT AND LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_peer_commands() {
    let network = MemoryNetwork::new();
    let (node, _task) = spawn_rumor(&network, 4000, PeerRegistry::new());

    assert!(node.add_peer("localhost:4001").await.unwrap());
    assert!(!node.add_peer("localhost:4001").await.unwrap());
    assert!(node.add_peer("127.0.0.1:4002").await.unwrap());
    assert_eq!(
        node.list_peers().await.unwrap(),
        vec![peer(4001), PeerAddress::parse("127.0.0.1:4002").unwrap()]
    );

    assert!(node.remove_peer("localhost:4001").await.unwrap());
    assert!(!node.remove_peer("localhost:4001").await.unwrap());
    assert_eq!(node.list_peers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_invalid_peer_fails_fast() {
    let network = MemoryNetwork::new();
    let (node, _task) = spawn_rumor(&network, 4000, PeerRegistry::new());

    let err = node.add_peer("not-an-address").await.unwrap_err();

    assert!(matches!(
        err,
        NodeError::Transport(TransportError::InvalidAddress(_))
    ));
    assert!(node.list_peers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_added_peer_joins_rounds() {
    let network = MemoryNetwork::new();
    let (a, _ta) = spawn_anti_entropy(&network, 5000, PeerRegistry::new(), fast_rounds());
    let (b, _tb) = spawn_anti_entropy(&network, 5001, PeerRegistry::new(), fast_rounds());

    let id = a.originate("late join").await.unwrap();
    b.add_peer("localhost:5000").await.unwrap();

    assert!(wait_for_message(&b, &id).await.is_some());
}

/// Transport whose sends never complete
struct StalledTransport {
    address: PeerAddress,
}

#[async_trait]
impl Transport for StalledTransport {
    async fn send_to(&self, _to: &PeerAddress, _payload: &[u8]) -> Result<usize, TransportError> {
        std::future::pending().await
    }

    async fn recv_from(&self) -> Result<(Vec<u8>, PeerAddress), TransportError> {
        std::future::pending().await
    }

    fn local_address(&self) -> PeerAddress {
        self.address.clone()
    }

    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

#[tokio::test]
async fn test_stalled_sends_do_not_block_commands() {
    let config = fast_rounds().with_broadcast_on_originate(true);
    let peers = PeerRegistry::from_peers([peer(5001), peer(5002)]);
    let engine = AntiEntropyEngine::new(5000, peers, config, StdRng::seed_from_u64(5000));
    let transport = StalledTransport { address: peer(5000) };
    let (node, _task) = Node::new(engine, transport).spawn();

    let first = timeout(DEADLINE, node.originate("one")).await.unwrap().unwrap();
    sleep(Duration::from_millis(100)).await;

    let second = timeout(DEADLINE, node.originate("two")).await.unwrap().unwrap();
    let peers = timeout(DEADLINE, node.list_peers()).await.unwrap().unwrap();
    let messages = timeout(DEADLINE, node.list_messages()).await.unwrap().unwrap();

    assert_eq!(peers.len(), 2);
    assert!(messages.iter().any(|(id, _)| id == &first));
    assert!(messages.iter().any(|(id, _)| id == &second));
}

#[tokio::test]
async fn test_loop_stops_when_handles_dropped() {
    let network = MemoryNetwork::new();
    let (node, task) = spawn_anti_entropy(&network, 5000, PeerRegistry::new(), fast_rounds());
    let clone = node.clone();

    node.originate("before stop").await.unwrap();
    drop(node);
    drop(clone);

    let engine = timeout(DEADLINE, task).await.unwrap().unwrap();
    assert_eq!(engine.store().len(), 1);
}

#[tokio::test]
async fn test_handle_reports_shutdown_after_abort() {
    let network = MemoryNetwork::new();
    let (node, task) = spawn_anti_entropy(&network, 5000, PeerRegistry::new(), fast_rounds());

    task.abort();
    let _ = task.await;

    assert_eq!(node.list_peers().await, Err(NodeError::Shutdown));
    assert_eq!(node.local_address(), &peer(5000));
}
