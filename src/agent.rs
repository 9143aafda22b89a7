//! Typed, traffic-counting messaging between two parties.
//!
//! A [`CommunicationAgent`] wraps one [`Channel`] to exactly one peer. Agents
//! are created by an [`AgentFactory`], which hands out one agent per
//! `(peer, name)` request. Both parties must request agents for the same names in
//! the same order, so that the n-th request for a name on one side is
//! connected to the n-th request for that name on the other side.
use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    net::SocketAddr,
    ops::{Add, AddAssign},
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, trace};

use crate::{
    block::Block,
    channel::{self, Channel, ErrorKind, MemoryChannel, TcpChannel},
    utils::{pack_bits, unpack_bits},
};

/// Payload bytes and messages sent and received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStats {
    /// Bytes sent to peers.
    pub sent: u64,
    /// Bytes received from peers.
    pub received: u64,
    /// Messages sent to peers.
    pub messages_sent: u64,
    /// Messages received from peers.
    pub messages_received: u64,
}

impl Add for TrafficStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            sent: self.sent + rhs.sent,
            received: self.received + rhs.received,
            messages_sent: self.messages_sent + rhs.messages_sent,
            messages_received: self.messages_received + rhs.messages_received,
        }
    }
}

impl AddAssign for TrafficStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// A point-to-point connection to one peer that (de-)serializes messages and
/// counts traffic.
#[derive(Debug)]
pub struct CommunicationAgent<C: Channel> {
    channel: C,
    my_id: usize,
    peer: usize,
    name: String,
    traffic: TrafficStats,
}

impl<C: Channel> CommunicationAgent<C> {
    /// Wraps a channel connected to `peer`.
    pub fn new(channel: C, my_id: usize, peer: usize, name: impl Into<String>) -> Self {
        Self {
            channel,
            my_id,
            peer,
            name: name.into(),
            traffic: TrafficStats::default(),
        }
    }

    /// The id of the local party.
    pub fn my_id(&self) -> usize {
        self.my_id
    }

    /// The id of the party on the other end.
    pub fn peer_id(&self) -> usize {
        self.peer
    }

    /// The name this agent was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cumulative traffic of this agent.
    pub fn traffic_statistics(&self) -> TrafficStats {
        self.traffic
    }

    /// Sends raw bytes.
    pub async fn send_bytes(&mut self, phase: &str, msg: Vec<u8>) -> Result<(), channel::Error> {
        trace!(peer = self.peer, phase, bytes = msg.len(), "send");
        let len = msg.len() as u64;
        self.channel.send_bytes(msg).await.map_err(|e| channel::Error {
            phase: phase.to_string(),
            reason: ErrorKind::SendError(format!("{e:?}")),
        })?;
        self.traffic.sent += len;
        self.traffic.messages_sent += 1;
        Ok(())
    }

    /// Receives exactly `len` raw bytes as one message.
    pub async fn recv_bytes(&mut self, phase: &str, len: usize) -> Result<Vec<u8>, channel::Error> {
        let msg = self.recv_any_bytes(phase).await?;
        if msg.len() != len {
            return Err(channel::Error {
                phase: phase.to_string(),
                reason: ErrorKind::InvalidLength {
                    expected: len,
                    actual: msg.len(),
                },
            });
        }
        Ok(msg)
    }

    async fn recv_any_bytes(&mut self, phase: &str) -> Result<Vec<u8>, channel::Error> {
        let msg = self.channel.recv_bytes().await.map_err(|e| channel::Error {
            phase: phase.to_string(),
            reason: ErrorKind::RecvError(format!("{e:?}")),
        })?;
        trace!(peer = self.peer, phase, bytes = msg.len(), "recv");
        self.traffic.received += msg.len() as u64;
        self.traffic.messages_received += 1;
        Ok(msg)
    }

    /// Serializes and sends a single value.
    pub async fn send_single<T: Serialize>(
        &mut self,
        phase: &str,
        value: &T,
    ) -> Result<(), channel::Error> {
        let msg = bincode::serialize(value).map_err(|e| channel::Error {
            phase: format!("sending {phase}"),
            reason: ErrorKind::SerdeError(format!("{e:?}")),
        })?;
        self.send_bytes(phase, msg).await
    }

    /// Receives and deserializes a single value.
    pub async fn recv_single<T: DeserializeOwned>(
        &mut self,
        phase: &str,
    ) -> Result<T, channel::Error> {
        let msg = self.recv_any_bytes(phase).await?;
        bincode::deserialize(&msg).map_err(|e| channel::Error {
            phase: format!("receiving {phase}"),
            reason: ErrorKind::SerdeError(format!("{e:?}")),
        })
    }

    /// Sends bits packed into bytes.
    pub async fn send_bools(&mut self, phase: &str, bits: &[bool]) -> Result<(), channel::Error> {
        self.send_bytes(phase, pack_bits(bits)).await
    }

    /// Receives `n` bits packed into bytes.
    pub async fn recv_bools(&mut self, phase: &str, n: usize) -> Result<Vec<bool>, channel::Error> {
        let bytes = self.recv_bytes(phase, n.div_ceil(8)).await?;
        Ok(unpack_bits(&bytes, n))
    }

    /// Sends integers as little endian bytes.
    pub async fn send_u64s(&mut self, phase: &str, values: &[u64]) -> Result<(), channel::Error> {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.send_bytes(phase, bytes).await
    }

    /// Receives `n` little endian integers.
    pub async fn recv_u64s(&mut self, phase: &str, n: usize) -> Result<Vec<u64>, channel::Error> {
        let bytes = self.recv_bytes(phase, n * 8).await?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| {
                let mut buf = [0; 8];
                buf.copy_from_slice(c);
                u64::from_le_bytes(buf)
            })
            .collect())
    }

    pub(crate) async fn send_blocks(
        &mut self,
        phase: &str,
        blocks: &[Block],
    ) -> Result<(), channel::Error> {
        let bytes: &[u8] = bytemuck::cast_slice(blocks);
        self.send_bytes(phase, bytes.to_vec()).await
    }

    pub(crate) async fn recv_blocks(
        &mut self,
        phase: &str,
        n: usize,
    ) -> Result<Vec<Block>, channel::Error> {
        let bytes = self.recv_bytes(phase, n * Block::BYTES).await?;
        Ok(bytes
            .chunks_exact(Block::BYTES)
            .map(|c| {
                let mut buf = [0; 16];
                buf.copy_from_slice(c);
                Block::new(buf)
            })
            .collect())
    }

    /// Sends `bits` to the peer and receives as many bits back.
    ///
    /// The party with the lower id sends first.
    pub async fn exchange_bools(
        &mut self,
        phase: &str,
        bits: &[bool],
    ) -> Result<Vec<bool>, channel::Error> {
        if self.my_id < self.peer {
            self.send_bools(phase, bits).await?;
            self.recv_bools(phase, bits.len()).await
        } else {
            let received = self.recv_bools(phase, bits.len()).await?;
            self.send_bools(phase, bits).await?;
            Ok(received)
        }
    }

    /// Sends `values` to the peer and receives as many values back.
    ///
    /// The party with the lower id sends first.
    pub async fn exchange_u64s(
        &mut self,
        phase: &str,
        values: &[u64],
    ) -> Result<Vec<u64>, channel::Error> {
        if self.my_id < self.peer {
            self.send_u64s(phase, values).await?;
            self.recv_u64s(phase, values.len()).await
        } else {
            let received = self.recv_u64s(phase, values.len()).await?;
            self.send_u64s(phase, values).await?;
            Ok(received)
        }
    }

    pub(crate) async fn exchange_blocks(
        &mut self,
        phase: &str,
        blocks: &[Block],
    ) -> Result<Vec<Block>, channel::Error> {
        if self.my_id < self.peer {
            self.send_blocks(phase, blocks).await?;
            self.recv_blocks(phase, blocks.len()).await
        } else {
            let received = self.recv_blocks(phase, blocks.len()).await?;
            self.send_blocks(phase, blocks).await?;
            Ok(received)
        }
    }
}

/// Creates [`CommunicationAgent`]s to the other parties of a computation.
pub trait AgentFactory {
    /// The channel type of the created agents.
    type Channel: Channel + Send;

    /// The id of the local party.
    fn party_id(&self) -> usize;

    /// Connects to `peer` on a channel called `name`.
    fn create(
        &mut self,
        peer: usize,
        name: &str,
    ) -> impl Future<Output = Result<CommunicationAgent<Self::Channel>, channel::Error>> + Send;
}

fn occurrence(counts: &mut HashMap<(usize, String), usize>, peer: usize, name: &str) -> usize {
    let count = counts.entry((peer, name.to_string())).or_default();
    let current = *count;
    *count += 1;
    current
}

type ChannelKey = (usize, usize, String, usize);

/// Creates agents connected over in-process [`MemoryChannel`]s.
#[derive(Debug, Clone)]
pub struct InMemoryAgentFactory {
    my_id: usize,
    num_parties: usize,
    pending: Arc<Mutex<HashMap<ChannelKey, MemoryChannel>>>,
    occurrences: HashMap<(usize, String), usize>,
    timeout: Option<Duration>,
}

impl InMemoryAgentFactory {
    /// One connected factory per party, indexed by party id.
    pub fn network(num_parties: usize) -> Vec<Self> {
        Self::network_with_timeout(num_parties, None)
    }

    /// Like [`InMemoryAgentFactory::network`], receive calls fail after `timeout`.
    pub fn network_with_timeout(num_parties: usize, timeout: Option<Duration>) -> Vec<Self> {
        let pending = Arc::new(Mutex::new(HashMap::new()));
        (0..num_parties)
            .map(|my_id| Self {
                my_id,
                num_parties,
                pending: Arc::clone(&pending),
                occurrences: HashMap::new(),
                timeout,
            })
            .collect()
    }

    fn connect(&mut self, peer: usize, name: &str) -> Result<MemoryChannel, channel::Error> {
        let phase = format!("connecting {name} to party {peer}");
        if peer == self.my_id || peer >= self.num_parties {
            return Err(channel::Error {
                phase,
                reason: ErrorKind::ConnectError(format!(
                    "no party {peer} in a network of {}",
                    self.num_parties
                )),
            });
        }
        let n = occurrence(&mut self.occurrences, peer, name);
        let key = (self.my_id.min(peer), self.my_id.max(peer), name.to_string(), n);
        let mut pending = self.pending.lock().map_err(|_| channel::Error {
            phase,
            reason: ErrorKind::ConnectError("channel registry poisoned".to_string()),
        })?;
        if let Some(channel) = pending.remove(&key) {
            return Ok(channel);
        }
        let (mine, theirs) = MemoryChannel::pair_with_timeout(self.timeout);
        pending.insert(key, theirs);
        Ok(mine)
    }
}

impl AgentFactory for InMemoryAgentFactory {
    type Channel = MemoryChannel;

    fn party_id(&self) -> usize {
        self.my_id
    }

    async fn create(
        &mut self,
        peer: usize,
        name: &str,
    ) -> Result<CommunicationAgent<MemoryChannel>, channel::Error> {
        let channel = self.connect(peer, name)?;
        debug!(my_id = self.my_id, peer, name, "in-memory agent created");
        Ok(CommunicationAgent::new(channel, self.my_id, peer, name))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone)]
struct Handshake {
    party: usize,
    name: String,
    occurrence: usize,
}

/// Creates agents connected over TCP.
///
/// The party with the lower id connects to the address of the higher id,
/// which accepts on its listener. Every connection starts with a handshake
/// naming the requested channel, so connections can be accepted in any order.
#[derive(Debug)]
pub struct TcpAgentFactory {
    my_id: usize,
    listener: TcpListener,
    peers: BTreeMap<usize, SocketAddr>,
    occurrences: HashMap<(usize, String), usize>,
    accepted: HashMap<Handshake, TcpChannel>,
    timeout: Option<Duration>,
    connect_attempts: usize,
}

impl TcpAgentFactory {
    /// A factory listening on `listener` that reaches the other parties at `peers`.
    pub fn new(my_id: usize, listener: TcpListener, peers: BTreeMap<usize, SocketAddr>) -> Self {
        Self {
            my_id,
            listener,
            peers,
            occurrences: HashMap::new(),
            accepted: HashMap::new(),
            timeout: None,
            connect_attempts: 50,
        }
    }

    /// Receive calls of created agents fail after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn connect(&mut self, peer: usize, handshake: Handshake) -> Result<TcpChannel, channel::Error> {
        let phase = format!("connecting {} to party {peer}", handshake.name);
        let addr = *self.peers.get(&peer).ok_or_else(|| channel::Error {
            phase: phase.clone(),
            reason: ErrorKind::ConnectError(format!("no address for party {peer}")),
        })?;
        let mut last_error = None;
        for _ in 0..self.connect_attempts {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let mut channel = TcpChannel::new(stream, self.timeout).map_err(|e| {
                        channel::Error {
                            phase: phase.clone(),
                            reason: ErrorKind::ConnectError(e.to_string()),
                        }
                    })?;
                    let msg = bincode::serialize(&handshake).map_err(|e| channel::Error {
                        phase: phase.clone(),
                        reason: ErrorKind::SerdeError(format!("{e:?}")),
                    })?;
                    channel.send_bytes(msg).await.map_err(|e| channel::Error {
                        phase: phase.clone(),
                        reason: ErrorKind::SendError(e.to_string()),
                    })?;
                    return Ok(channel);
                }
                Err(e) => {
                    trace!(peer, %addr, error = %e, "connect failed, retrying");
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
        Err(channel::Error {
            phase,
            reason: ErrorKind::ConnectError(format!("{last_error:?}")),
        })
    }

    async fn accept(&mut self, expected: Handshake) -> Result<TcpChannel, channel::Error> {
        let phase = format!("accepting {} from party {}", expected.name, expected.party);
        let connect_error = |e: std::io::Error| channel::Error {
            phase: phase.clone(),
            reason: ErrorKind::ConnectError(e.to_string()),
        };
        loop {
            if let Some(channel) = self.accepted.remove(&expected) {
                return Ok(channel);
            }
            let (stream, addr) = self.listener.accept().await.map_err(connect_error)?;
            let mut channel = TcpChannel::new(stream, self.timeout).map_err(connect_error)?;
            let msg = channel.recv_bytes().await.map_err(|e| channel::Error {
                phase: phase.clone(),
                reason: ErrorKind::RecvError(format!("{e:?}")),
            })?;
            let handshake: Handshake = bincode::deserialize(&msg).map_err(|e| channel::Error {
                phase: phase.clone(),
                reason: ErrorKind::SerdeError(format!("{e:?}")),
            })?;
            trace!(%addr, party = handshake.party, name = %handshake.name, "accepted connection");
            self.accepted.insert(handshake, channel);
        }
    }
}

impl AgentFactory for TcpAgentFactory {
    type Channel = TcpChannel;

    fn party_id(&self) -> usize {
        self.my_id
    }

    async fn create(
        &mut self,
        peer: usize,
        name: &str,
    ) -> Result<CommunicationAgent<TcpChannel>, channel::Error> {
        let occurrence = occurrence(&mut self.occurrences, peer, name);
        let channel = if self.my_id < peer {
            let handshake = Handshake {
                party: self.my_id,
                name: name.to_string(),
                occurrence,
            };
            self.connect(peer, handshake).await?
        } else {
            let expected = Handshake {
                party: peer,
                name: name.to_string(),
                occurrence,
            };
            self.accept(expected).await?
        };
        debug!(my_id = self.my_id, peer, name, "tcp agent created");
        Ok(CommunicationAgent::new(channel, self.my_id, peer, name))
    }
}
