//! Poll cycle driver.
//!
//! Polls on a fixed interval, publishes only what changed, and never runs two
//! cycles at once.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::common::Snapshot;
use crate::discord::{MessageSink, PublishOutcome, Publisher, Renderer};
use crate::monitor::differ;
use crate::monitor::poller::{ServerPoller, StatusQuery};

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Same board as last time, nothing sent.
    Unchanged,
    Published,
    /// Publishing failed; the next cycle compares against the old baseline.
    NotPublished,
}

pub struct Monitor<Q, S> {
    poller: ServerPoller<Q>,
    renderer: Renderer,
    publisher: Publisher<S>,
    interval: Duration,
    /// Last snapshot that actually made it to the channel.
    last_published: Option<Snapshot>,
}

impl<Q: StatusQuery, S: MessageSink> Monitor<Q, S> {
    pub fn new(
        poller: ServerPoller<Q>,
        renderer: Renderer,
        publisher: Publisher<S>,
        interval: Duration,
    ) -> Self {
        Self {
            poller,
            renderer,
            publisher,
            interval,
            last_published: None,
        }
    }

    pub fn last_published(&self) -> Option<&Snapshot> {
        self.last_published.as_ref()
    }

    /// Poll, compare, and publish if anything visible changed.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let snapshot = self.renderer.displayed(self.poller.poll_all().await);

        let previous = self.last_published.as_ref();
        if !differ::has_changed(previous, &snapshot) {
            debug!("No visible changes, skipping update");
            return CycleOutcome::Unchanged;
        }
        info!("Updating status board: {}", differ::diff(previous, &snapshot).summary());

        let payload = self.renderer.render(&snapshot);
        match self.publisher.publish(&payload).await {
            PublishOutcome::Published(_) => {
                self.last_published = Some(snapshot);
                CycleOutcome::Published
            }
            PublishOutcome::Failed(e) => {
                warn!("Status board not updated this cycle: {}", e);
                CycleOutcome::NotPublished
            }
            PublishOutcome::Fatal(_) => CycleOutcome::NotPublished,
        }
    }

    /// Run cycles until `shutdown` turns true (or its sender is dropped).
    ///
    /// The first cycle starts immediately. Ticks that fire while a cycle is
    /// still running are skipped, not queued.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Monitoring {} servers every {}s",
            self.poller.servers().len(),
            self.interval.as_secs()
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Shutdown requested, abandoning the running cycle");
                    break;
                }
                outcome = self.run_cycle() => debug!("Cycle finished: {:?}", outcome),
            }

            let elapsed = started.elapsed();
            if elapsed > self.interval {
                warn!(
                    "Cycle took {:.1}s, longer than the {}s interval; skipping missed ticks",
                    elapsed.as_secs_f64(),
                    self.interval.as_secs()
                );
            }
        }

        info!("Monitor stopped");
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as shutdown too.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
    use std::sync::Arc;

    use serenity::async_trait;

    use crate::common::error::{PublishError, PublishResult};
    use crate::common::{ServerAddress, ServerStatus, TrackedMessage};
    use crate::config::{DisplayConfig, PollSettings, PublishSettings};
    use crate::discord::{MessageStore, RenderedPayload};
    use crate::monitor::differ::tests::info;

    #[derive(Default)]
    struct Probe {
        players: AtomicU8,
        hidden_players: AtomicU8,
        queries: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        publishes: AtomicUsize,
        reject: AtomicBool,
    }

    struct FakeQuerier {
        probe: Arc<Probe>,
        delay: Duration,
    }

    #[async_trait]
    impl StatusQuery for FakeQuerier {
        async fn query(&self, address: &ServerAddress, _timeout: Duration) -> ServerStatus {
            self.probe.queries.fetch_add(1, Ordering::SeqCst);
            let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.peak.fetch_max(now, Ordering::SeqCst);

            time::sleep(self.delay).await;

            self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
            let players = if address.host() == HIDDEN_HOST {
                self.probe.hidden_players.load(Ordering::SeqCst)
            } else {
                self.probe.players.load(Ordering::SeqCst)
            };
            ServerStatus::online(address.clone(), info("Alpha", "de_dust2", players, 32))
        }
    }

    struct FakeSink {
        probe: Arc<Probe>,
    }

    impl FakeSink {
        fn send(&self) -> PublishResult<TrackedMessage> {
            if self.probe.reject.load(Ordering::SeqCst) {
                return Err(PublishError::Fatal {
                    message: "Missing Access".to_string(),
                });
            }
            self.probe.publishes.fetch_add(1, Ordering::SeqCst);
            Ok(TrackedMessage {
                channel_id: 1,
                message_id: 2,
            })
        }
    }

    #[async_trait]
    impl MessageSink for FakeSink {
        async fn locate_or_create(
            &self,
            _payload: &RenderedPayload,
            _known: Option<TrackedMessage>,
        ) -> PublishResult<TrackedMessage> {
            self.send()
        }

        async fn edit(&self, _tracked: &TrackedMessage, _payload: &RenderedPayload) -> PublishResult<()> {
            self.send().map(|_| ())
        }
    }

    const HIDDEN_HOST: &str = "10.0.0.2";

    fn monitor(probe: &Arc<Probe>, delay: Duration, interval: Duration) -> Monitor<FakeQuerier, FakeSink> {
        monitor_with(
            probe,
            delay,
            interval,
            vec![ServerAddress::new("10.0.0.1", 27015)],
            DisplayConfig::default(),
        )
    }

    fn monitor_with(
        probe: &Arc<Probe>,
        delay: Duration,
        interval: Duration,
        servers: Vec<ServerAddress>,
        display: DisplayConfig,
    ) -> Monitor<FakeQuerier, FakeSink> {
        let poll = PollSettings {
            interval,
            cycle_timeout: Duration::from_secs(60),
            ..PollSettings::default()
        };
        let querier = FakeQuerier {
            probe: Arc::clone(probe),
            delay,
        };
        let poller = ServerPoller::new(querier, servers, &poll);
        let publisher = Publisher::new(
            FakeSink {
                probe: Arc::clone(probe),
            },
            1,
            MessageStore::default(),
            PublishSettings {
                state_file: None,
                ..PublishSettings::default()
            },
        );
        Monitor::new(poller, Renderer::new(display), publisher, interval)
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_snapshot_not_republished() {
        let probe = Arc::new(Probe::default());
        let mut monitor = monitor(&probe, Duration::from_millis(10), Duration::from_secs(30));

        assert_eq!(monitor.run_cycle().await, CycleOutcome::Published);
        assert_eq!(monitor.run_cycle().await, CycleOutcome::Unchanged);
        assert_eq!(probe.publishes.load(Ordering::SeqCst), 1);

        probe.players.store(4, Ordering::SeqCst);
        assert_eq!(monitor.run_cycle().await, CycleOutcome::Published);
        assert_eq!(probe.publishes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_server_change_not_republished() {
        let probe = Arc::new(Probe::default());
        let shown = ServerAddress::new("10.0.0.1", 27015);
        let hidden = ServerAddress::new(HIDDEN_HOST, 27015);
        let display = DisplayConfig {
            only: vec![shown.clone()],
            ..DisplayConfig::default()
        };
        let mut monitor = monitor_with(
            &probe,
            Duration::from_millis(10),
            Duration::from_secs(30),
            vec![shown, hidden],
            display,
        );

        assert_eq!(monitor.run_cycle().await, CycleOutcome::Published);

        probe.hidden_players.store(9, Ordering::SeqCst);
        assert_eq!(monitor.run_cycle().await, CycleOutcome::Unchanged);
        assert_eq!(probe.publishes.load(Ordering::SeqCst), 1);

        probe.players.store(3, Ordering::SeqCst);
        assert_eq!(monitor.run_cycle().await, CycleOutcome::Published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_publish_keeps_old_baseline() {
        let probe = Arc::new(Probe::default());
        probe.reject.store(true, Ordering::SeqCst);
        let mut monitor = monitor(&probe, Duration::from_millis(10), Duration::from_secs(30));

        assert_eq!(monitor.run_cycle().await, CycleOutcome::NotPublished);
        assert!(monitor.last_published().is_none());

        probe.reject.store(false, Ordering::SeqCst);
        assert_eq!(monitor.run_cycle().await, CycleOutcome::Published);
        assert!(monitor.last_published().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycles_never_overlap() {
        let probe = Arc::new(Probe::default());
        // Each cycle takes 25s against a 10s interval.
        let monitor = monitor(&probe, Duration::from_secs(25), Duration::from_secs(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(shutdown_rx));

        time::sleep(Duration::from_secs(100)).await;
        shutdown_tx.send(true).unwrap();
        tokio_test::assert_ok!(handle.await);

        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
        let queries = probe.queries.load(Ordering::SeqCst);
        assert!((3..=4).contains(&queries), "{} queries", queries);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_running_cycle() {
        let probe = Arc::new(Probe::default());
        let monitor = monitor(&probe, Duration::from_secs(3600), Duration::from_secs(30));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(shutdown_rx));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(probe.queries.load(Ordering::SeqCst), 1);

        shutdown_tx.send(true).unwrap();
        let joined = time::timeout(Duration::from_secs(1), handle).await;
        tokio_test::assert_ok!(tokio_test::assert_ok!(joined));
        assert_eq!(probe.publishes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_monitor() {
        let probe = Arc::new(Probe::default());
        let monitor = monitor(&probe, Duration::from_millis(10), Duration::from_secs(30));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        let joined = time::timeout(Duration::from_secs(1), monitor.run(shutdown_rx)).await;
        assert!(joined.is_ok());
    }
}
