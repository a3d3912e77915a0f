//! Polling, change detection and the cycle loop.

pub mod differ;
pub mod poller;
pub mod scheduler;

pub use poller::{ServerPoller, StatusQuery};
pub use scheduler::{CycleOutcome, Monitor};
