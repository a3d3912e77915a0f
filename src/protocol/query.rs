//! A2S query client.
//!
//! One query opens its own UDP socket connected to the target, so the kernel
//! only hands back datagrams sent by that peer. Every failure is folded into
//! the returned [`ServerStatus`]; nothing here is fatal to the caller.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::common::error::ProtocolError;
use crate::common::{FailureReason, ServerAddress, ServerInfo, ServerStatus};
use crate::protocol::info::{InfoReply, InfoRequest};
use crate::protocol::packets::{Packet, PacketEncode};
use crate::protocol::players::{PlayerReply, PlayerRequest};
use crate::protocol::split::SplitAssembler;

/// Largest datagram a Source server sends.
const MAX_DATAGRAM: usize = 4096;

/// Challenge rounds tolerated before giving up on a server.
const MAX_CHALLENGES: u8 = 3;

/// Failure of a single exchange, before it is turned into a [`FailureReason`].
#[derive(Debug)]
enum QueryError {
    Network(io::Error),
    Protocol(ProtocolError),
}

impl From<io::Error> for QueryError {
    fn from(e: io::Error) -> Self {
        Self::Network(e)
    }
}

impl From<ProtocolError> for QueryError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<QueryError> for FailureReason {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Network(e) if e.kind() == io::ErrorKind::TimedOut => FailureReason::Timeout,
            QueryError::Network(e) => FailureReason::Network(e.to_string()),
            QueryError::Protocol(e) => FailureReason::Protocol(e.to_string()),
        }
    }
}

/// Queries single servers over A2S.
#[derive(Debug, Clone, Default)]
pub struct QueryClient {
    query_players: bool,
}

impl QueryClient {
    pub fn new(query_players: bool) -> Self {
        Self { query_players }
    }

    /// Query one server, spending at most `timeout` on it.
    ///
    /// The player list exchange (when enabled) shares the same deadline; if it
    /// fails the server is still reported online, just without names.
    pub async fn query(&self, address: &ServerAddress, timeout: Duration) -> ServerStatus {
        let deadline = Instant::now() + timeout;

        let mut conn = match timeout_at(deadline, Connection::open(address)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return self.failed(address, e.into()),
            Err(_) => return self.failed(address, FailureReason::Timeout),
        };

        let mut info = match timeout_at(deadline, conn.info()).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => return self.failed(address, e.into()),
            Err(_) => return self.failed(address, FailureReason::Timeout),
        };

        if info.game_port == 0 {
            info.game_port = address.port();
        }

        if self.query_players {
            info.player_names = match timeout_at(deadline, conn.players()).await {
                Ok(Ok(names)) => Some(names),
                Ok(Err(e)) => {
                    debug!("Player list from {} failed: {}", address, FailureReason::from(e));
                    None
                }
                Err(_) => {
                    debug!("Player list from {} timed out", address);
                    None
                }
            };
        }

        debug!(
            "{} is online: '{}' on {} ({}/{}) in {:?}",
            address, info.name, info.map, info.players, info.max_players, info.latency
        );
        ServerStatus::online(address.clone(), info)
    }

    fn failed(&self, address: &ServerAddress, reason: FailureReason) -> ServerStatus {
        debug!("Couldn't query server {}: {}", address, reason);
        ServerStatus::offline(address.clone(), reason)
    }
}

/// A UDP socket connected to one server.
struct Connection {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl Connection {
    async fn open(address: &ServerAddress) -> Result<Self, QueryError> {
        let target = lookup_host((address.host(), address.port()))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no addresses found for {}", address.host()),
                )
            })?;

        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;

        Ok(Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    async fn send(&self, request: &impl PacketEncode) -> Result<Instant, QueryError> {
        let mut buf = BytesMut::new();
        request.encode(&mut buf);
        self.socket.send(&buf).await?;
        Ok(Instant::now())
    }

    /// Receive one complete reply, reassembling split fragments.
    async fn recv(&mut self) -> Result<Packet, QueryError> {
        let mut assembler = SplitAssembler::new();
        loop {
            let n = self.socket.recv(&mut self.buf).await?;
            let datagram = Bytes::copy_from_slice(&self.buf[..n]);
            if let Some(reply) = assembler.push(datagram)? {
                return Ok(Packet::parse(reply)?);
            }
        }
    }

    async fn info(&mut self) -> Result<ServerInfo, QueryError> {
        let mut request = InfoRequest::default();

        for _ in 0..=MAX_CHALLENGES {
            let sent_at = self.send(&request).await?;
            let reply = InfoReply::from_packet(self.recv().await?)?;
            let latency = sent_at.elapsed();

            match reply {
                InfoReply::Challenge(challenge) => {
                    request.challenge = Some(challenge.0);
                }
                InfoReply::Source(info) => {
                    return Ok(ServerInfo {
                        name: info.name,
                        map: info.map,
                        folder: info.folder,
                        game: info.game,
                        players: info.players,
                        max_players: info.max_players,
                        bots: info.bots,
                        game_port: info.game_port.unwrap_or(0),
                        latency,
                        player_names: None,
                    });
                }
                InfoReply::GoldSrc(info) => {
                    return Ok(ServerInfo {
                        game_port: info.game_port().unwrap_or(0),
                        name: info.name,
                        map: info.map,
                        folder: info.folder,
                        game: info.game,
                        players: info.players,
                        max_players: info.max_players,
                        bots: info.bots,
                        latency,
                        player_names: None,
                    });
                }
            }
        }

        Err(ProtocolError::ChallengeLoop(MAX_CHALLENGES).into())
    }

    async fn players(&mut self) -> Result<Vec<String>, QueryError> {
        let mut request = PlayerRequest::default();

        for _ in 0..=MAX_CHALLENGES {
            self.send(&request).await?;
            match PlayerReply::from_packet(self.recv().await?)? {
                PlayerReply::Challenge(challenge) => request.challenge = challenge.0,
                PlayerReply::Players(list) => return Ok(list.names()),
            }
        }

        Err(ProtocolError::ChallengeLoop(MAX_CHALLENGES).into())
    }
}
