//! Persistence of the tracked message id across restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::TrackedMessage;

/// JSON file holding the id of the status message.
///
/// Without a path every operation is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    path: Option<PathBuf>,
}

impl MessageStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the stored message for `channel_id`.
    ///
    /// A missing or unreadable file, or one naming another channel, yields `None`.
    pub fn load(&self, channel_id: u64) -> Option<TrackedMessage> {
        let path = self.path.as_ref()?;

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<TrackedMessage>(&content) {
            Ok(tracked) if tracked.channel_id == channel_id => {
                debug!("Loaded message {} from {}", tracked.message_id, path.display());
                Some(tracked)
            }
            Ok(tracked) => {
                debug!(
                    "Ignoring {}: it belongs to channel {}",
                    path.display(),
                    tracked.channel_id
                );
                None
            }
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, tracked: &TrackedMessage) {
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let result = serde_json::to_string(tracked)
            .map_err(io::Error::from)
            .and_then(|json| fs::write(path, json));
        if let Err(e) = result {
            warn!("Failed to save message id to {}: {}", path.display(), e);
        }
    }

    pub fn clear(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
