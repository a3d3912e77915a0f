//! Concurrent polling of every configured server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serenity::async_trait;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::common::{FailureReason, ServerAddress, ServerStatus, Snapshot};
use crate::config::PollSettings;
use crate::protocol::QueryClient;

/// Something that can ask one server for its status.
///
/// Implementations must never fail: every problem ends up as an offline status.
#[async_trait]
pub trait StatusQuery: Send + Sync + 'static {
    async fn query(&self, address: &ServerAddress, timeout: Duration) -> ServerStatus;
}

#[async_trait]
impl StatusQuery for QueryClient {
    async fn query(&self, address: &ServerAddress, timeout: Duration) -> ServerStatus {
        QueryClient::query(self, address, timeout).await
    }
}

/// Fans queries out over the server list and gathers one [`Snapshot`].
pub struct ServerPoller<Q> {
    querier: Arc<Q>,
    servers: Vec<ServerAddress>,
    server_timeout: Duration,
    cycle_timeout: Duration,
    concurrency: usize,
}

impl<Q: StatusQuery> ServerPoller<Q> {
    pub fn new(querier: Q, servers: Vec<ServerAddress>, settings: &PollSettings) -> Self {
        Self {
            querier: Arc::new(querier),
            servers,
            server_timeout: settings.server_timeout,
            cycle_timeout: settings.cycle_timeout,
            concurrency: settings.concurrency.max(1),
        }
    }

    pub fn servers(&self) -> &[ServerAddress] {
        &self.servers
    }

    /// Query every server once.
    ///
    /// The snapshot holds exactly one status per configured server, in
    /// configuration order, whatever order the replies arrive in.
    pub async fn poll_all(&self) -> Snapshot {
        let taken_at = Utc::now();
        let deadline = Instant::now() + self.cycle_timeout;

        let servers = stream::iter(self.servers.clone())
            .map(|address| {
                let querier = Arc::clone(&self.querier);
                query_one(querier, address, self.server_timeout, deadline)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let snapshot = Snapshot::new(taken_at, servers);
        debug!(
            "Polled {} servers: {} online, {} offline",
            snapshot.servers.len(),
            snapshot.online_count(),
            snapshot.offline_count()
        );
        snapshot
    }
}

async fn query_one<Q: StatusQuery>(
    querier: Arc<Q>,
    address: ServerAddress,
    timeout: Duration,
    deadline: Instant,
) -> ServerStatus {
    match time::timeout_at(deadline, querier.query(&address, timeout)).await {
        Ok(mut status) => {
            if let Some(reason) = status.failure() {
                debug!("{} offline: {}", address, reason);
            }
            status.address = address;
            status
        }
        Err(_) => {
            warn!("{} still pending at the cycle deadline", address);
            ServerStatus::offline(address, FailureReason::Timeout)
        }
    }
}
