// Node Runtime - The single event loop of a node
//
// One task owns the engine. Inbound datagrams (from a receive task), round
// ticks and operator commands are serialized onto it with `select!`, so the
// replica state needs no locking. Sends run on their own tasks and are
// fire-and-forget: failures are logged and never retried.
//
// Peer hostnames are resolved when a peer is added (on the caller's task) and
// once at startup for the initial registry, never while handling traffic.

use crate::node::config::Variant;
use crate::node::replica::Replica;
use crate::node::routes::AddressBook;
use crate::node::scheduler::{next_tick, RoundScheduler};
use crate::node::ConfigError;
use crate::store::MessageId;
use crate::transport::{Datagram, PeerAddress, Transport, TransportError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Node errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot {operation} on a {variant} node")]
    Unsupported {
        operation: &'static str,
        variant: Variant,
    },

    #[error("Node is not running")]
    Shutdown,
}

/// Operations sent from a handle to the event loop
enum NodeCommand {
    AddPeer {
        peer: PeerAddress,
        wire: PeerAddress,
        reply: oneshot::Sender<bool>,
    },
    RemovePeer {
        peer: PeerAddress,
        reply: oneshot::Sender<bool>,
    },
    ListPeers {
        reply: oneshot::Sender<Vec<PeerAddress>>,
    },
    ListMessages {
        reply: oneshot::Sender<Result<Vec<(MessageId, String)>, NodeError>>,
    },
    DeleteMessage {
        id: MessageId,
        reply: oneshot::Sender<Result<bool, NodeError>>,
    },
    Originate {
        text: String,
        reply: oneshot::Sender<MessageId>,
    },
}

// ============================================================================
// NODE HANDLE
// ============================================================================

/// Cloneable handle for operating a running node
///
/// The node loop stops once every handle is dropped.
#[derive(Clone)]
pub struct NodeHandle {
    commands: mpsc::Sender<NodeCommand>,
    resolver: Arc<dyn Transport>,
    local_address: PeerAddress,
    variant: Variant,
}

impl NodeHandle {
    /// Address the node receives on
    pub fn local_address(&self) -> &PeerAddress {
        &self.local_address
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Register a peer
    /// Returns false if it was already registered
    ///
    /// The address must parse and resolve; nothing is stored otherwise.
    pub async fn add_peer(&self, address: &str) -> Result<bool, NodeError> {
        let peer = PeerAddress::parse(address)?;
        let wire = self.resolver.resolve(&peer).await?;
        self.request(|reply| NodeCommand::AddPeer { peer, wire, reply })
            .await
    }

    /// Unregister a peer
    /// Returns false if it was not registered
    pub async fn remove_peer(&self, address: &str) -> Result<bool, NodeError> {
        let peer = PeerAddress::parse(address)?;
        self.request(|reply| NodeCommand::RemovePeer { peer, reply }).await
    }

    /// Current peers in insertion order
    pub async fn list_peers(&self) -> Result<Vec<PeerAddress>, NodeError> {
        self.request(|reply| NodeCommand::ListPeers { reply }).await
    }

    /// Stored messages (anti-entropy only)
    pub async fn list_messages(&self) -> Result<Vec<(MessageId, String)>, NodeError> {
        self.request(|reply| NodeCommand::ListMessages { reply })
            .await?
    }

    /// Delete a message locally (anti-entropy only)
    pub async fn delete_message(&self, id: &str) -> Result<bool, NodeError> {
        let id = MessageId::from(id.trim());
        self.request(|reply| NodeCommand::DeleteMessage { id, reply })
            .await?
    }

    /// Create and disseminate a new message
    pub async fn originate(&self, text: &str) -> Result<MessageId, NodeError> {
        let text = text.to_string();
        self.request(|reply| NodeCommand::Originate { text, reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> NodeCommand,
    ) -> Result<T, NodeError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| NodeError::Shutdown)?;
        response.await.map_err(|_| NodeError::Shutdown)
    }
}

// ============================================================================
// NODE
// ============================================================================

/// A node ready to run: an engine plus the transport it talks over
pub struct Node<R, T> {
    replica: R,
    transport: T,
    command_buffer: usize,
    datagram_buffer: usize,
}

impl<R, T> Node<R, T>
where
    R: Replica,
    T: Transport + 'static,
{
    pub fn new(replica: R, transport: T) -> Self {
        Self {
            replica,
            transport,
            command_buffer: 256,
            datagram_buffer: 1024,
        }
    }

    /// Set channel capacities (values of zero are raised to one)
    pub fn with_buffers(mut self, command_buffer: usize, datagram_buffer: usize) -> Self {
        self.command_buffer = command_buffer.max(1);
        self.datagram_buffer = datagram_buffer.max(1);
        self
    }

    /// Start the receive task and the event loop
    ///
    /// The returned task yields the engine once the loop has stopped.
    pub fn spawn(self) -> (NodeHandle, JoinHandle<R>) {
        let transport = Arc::new(self.transport);
        let local_address = transport.local_address();

        let resolver: Arc<dyn Transport> = transport.clone();
        let (command_tx, command_rx) = mpsc::channel(self.command_buffer);
        let (datagram_tx, datagram_rx) = mpsc::channel(self.datagram_buffer);
        let receiver = spawn_receiver(Arc::clone(&transport), datagram_tx);

        info!(
            variant = %R::VARIANT,
            address = %local_address,
            peers = self.replica.registry().len(),
            "node started"
        );

        let event_loop = EventLoop {
            replica: self.replica,
            transport,
            routes: AddressBook::default(),
            inbound: datagram_rx,
            commands: command_rx,
            receiver,
        };
        let task = tokio::spawn(event_loop.run());

        let handle = NodeHandle {
            commands: command_tx,
            resolver,
            local_address,
            variant: R::VARIANT,
        };
        (handle, task)
    }
}

/// Forward every received datagram into the event loop
fn spawn_receiver<T>(
    transport: Arc<T>,
    datagrams: mpsc::Sender<(Vec<u8>, PeerAddress)>,
) -> JoinHandle<()>
where
    T: Transport + 'static,
{
    tokio::spawn(async move {
        loop {
            match transport.recv_from().await {
                Ok(datagram) => {
                    if datagrams.send(datagram).await.is_err() {
                        break;
                    }
                }
                Err(e) if e.is_fatal() => {
                    debug!(error = %e, "receive loop stopped");
                    break;
                }
                Err(e) => warn!(error = %e, "receive failed"),
            }
        }
    })
}

struct EventLoop<R, T> {
    replica: R,
    transport: Arc<T>,
    routes: AddressBook,
    inbound: mpsc::Receiver<(Vec<u8>, PeerAddress)>,
    commands: mpsc::Receiver<NodeCommand>,
    receiver: JoinHandle<()>,
}

impl<R, T> EventLoop<R, T>
where
    R: Replica,
    T: Transport + 'static,
{
    async fn run(mut self) -> R {
        self.resolve_initial_peers().await;
        let mut scheduler = self.replica.round_interval().map(RoundScheduler::new);

        loop {
            tokio::select! {
                Some((data, from)) = self.inbound.recv() => {
                    self.handle_datagram(&data, &from);
                }
                _ = next_tick(&mut scheduler) => {
                    let datagrams = self.replica.on_tick();
                    self.send(datagrams);
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        self.receiver.abort();
        debug!("node loop stopped");
        self.replica
    }

    /// Unresolvable peers stay registered and are sent to by name
    async fn resolve_initial_peers(&mut self) {
        let peers = self.replica.registry().list().to_vec();
        for peer in peers {
            match self.transport.resolve(&peer).await {
                Ok(wire) => self.routes.insert(peer, wire),
                Err(e) => warn!(%peer, error = %e, "cannot resolve initial peer"),
            }
        }
    }

    fn handle_datagram(&mut self, data: &[u8], from: &PeerAddress) {
        let from = self.routes.inbound(from);
        match self.replica.dispatch(data, &from) {
            Ok(replies) => self.send(replies),
            Err(e) if e.is_decode_error() => warn!(error = %e, "discarding invalid message"),
            Err(e) => debug!(error = %e, "ignoring message"),
        }
    }

    fn handle_command(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::AddPeer { peer, wire, reply } => {
                self.routes.insert(peer.clone(), wire);
                let added = self.replica.registry_mut().add(peer.clone());
                if added {
                    info!(%peer, "peer added");
                } else {
                    debug!(%peer, "peer already known");
                }
                let _ = reply.send(added);
            }
            NodeCommand::RemovePeer { peer, reply } => {
                let removed = self.replica.registry_mut().remove(&peer);
                self.routes.remove(&peer);
                if removed {
                    info!(%peer, "peer removed");
                } else {
                    debug!(%peer, "peer not found");
                }
                let _ = reply.send(removed);
            }
            NodeCommand::ListPeers { reply } => {
                let _ = reply.send(self.replica.registry().list().to_vec());
            }
            NodeCommand::ListMessages { reply } => {
                let _ = reply.send(self.replica.list_messages());
            }
            NodeCommand::DeleteMessage { id, reply } => {
                let _ = reply.send(self.replica.remove_message(&id));
            }
            NodeCommand::Originate { text, reply } => {
                let (id, datagrams) = self.replica.on_originate(text);
                self.send(datagrams);
                let _ = reply.send(id);
            }
        }
    }
}

impl<R, T> EventLoop<R, T>
where
    T: Transport + 'static,
{
    /// Hand datagrams to a send task so the loop never waits on the network
    fn send(&self, datagrams: Vec<Datagram>) {
        if datagrams.is_empty() {
            return;
        }
        let datagrams: Vec<Datagram> = datagrams
            .into_iter()
            .map(|d| Datagram::new(self.routes.outbound(&d.to), d.payload))
            .collect();
        let transport = Arc::clone(&self.transport);

        tokio::spawn(async move {
            for datagram in datagrams {
                if let Err(e) = transport.send_to(&datagram.to, &datagram.payload).await {
                    warn!(peer = %datagram.to, error = %e, "send failed");
                }
            }
        });
    }
}
