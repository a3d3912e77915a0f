//! Pushes rendered payloads to the single tracked message.

use std::time::Duration;

use backon::BackoffBuilder;
use serenity::async_trait;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::error::{PublishError, PublishResult};
use crate::common::TrackedMessage;
use crate::config::PublishSettings;
use crate::discord::dashboard::RenderedPayload;
use crate::discord::store::MessageStore;

/// The two things the publisher needs from a chat platform.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Find the status message and bring it up to date, or post a new one.
    ///
    /// `known` is the message remembered from an earlier run, if any.
    async fn locate_or_create(
        &self,
        payload: &RenderedPayload,
        known: Option<TrackedMessage>,
    ) -> PublishResult<TrackedMessage>;

    async fn edit(&self, tracked: &TrackedMessage, payload: &RenderedPayload) -> PublishResult<()>;
}

#[derive(Debug)]
pub enum PublishOutcome {
    Published(TrackedMessage),
    /// Retries ran out. The next cycle tries again.
    Failed(PublishError),
    /// Nothing to gain from retrying this cycle.
    Fatal(PublishError),
}

#[cfg(test)]
impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

pub struct Publisher<S> {
    sink: S,
    channel_id: u64,
    tracked: Option<TrackedMessage>,
    store: MessageStore,
    settings: PublishSettings,
}

impl<S: MessageSink> Publisher<S> {
    pub fn new(sink: S, channel_id: u64, store: MessageStore, settings: PublishSettings) -> Self {
        Self {
            sink,
            channel_id,
            tracked: None,
            store,
            settings,
        }
    }

    pub fn tracked(&self) -> Option<TrackedMessage> {
        self.tracked
    }

    /// Bring the tracked message in line with `payload`.
    ///
    /// Rate limits and transient failures are retried up to `max_retries`
    /// times; everything else ends the attempt immediately.
    pub async fn publish(&mut self, payload: &RenderedPayload) -> PublishOutcome {
        let mut backoff = self.backoff();
        let mut retries = 0;

        loop {
            let error = match self.attempt(payload).await {
                Ok(tracked) => return PublishOutcome::Published(tracked),
                Err(e) => e,
            };

            if !error.is_retryable() {
                if let PublishError::MessageGone { .. } = error {
                    warn!("Status message disappeared, a new one will be located or created");
                    self.forget();
                } else {
                    error!("Publishing failed: {}", error);
                }
                return PublishOutcome::Fatal(error);
            }

            if retries >= self.settings.max_retries {
                warn!("Publishing failed after {} retries: {}", retries, error);
                return PublishOutcome::Failed(error);
            }
            retries += 1;

            let fallback = backoff.next().unwrap_or(self.settings.max_backoff);
            let delay = match error {
                PublishError::RateLimited {
                    retry_after: Some(retry_after),
                } => retry_after,
                _ => fallback,
            };
            warn!(
                "{} - retry {}/{} in {:.1}s",
                error,
                retries,
                self.settings.max_retries,
                delay.as_secs_f64()
            );
            sleep(delay).await;
        }
    }

    async fn attempt(&mut self, payload: &RenderedPayload) -> PublishResult<TrackedMessage> {
        if let Some(tracked) = self.tracked {
            self.sink.edit(&tracked, payload).await?;
            debug!("Edited message {}", tracked.message_id);
            return Ok(tracked);
        }

        let known = self.store.load(self.channel_id);
        let tracked = self.sink.locate_or_create(payload, known).await?;
        if known != Some(tracked) {
            info!("Tracking status message {}", tracked.message_id);
            self.store.save(&tracked);
        }
        self.tracked = Some(tracked);
        Ok(tracked)
    }

    fn forget(&mut self) {
        self.tracked = None;
        self.store.clear();
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        backon::ExponentialBuilder::default()
            .with_min_delay(self.settings.min_backoff)
            .with_max_delay(self.settings.max_backoff)
            .with_factor(2.0)
            .with_jitter()
            .without_max_times()
            .build()
    }
}
