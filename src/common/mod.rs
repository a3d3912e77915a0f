//! Common utilities and types shared across the application.

pub mod error;
pub mod types;

pub use types::{
    FailureReason, ServerAddress, ServerInfo, ServerState, ServerStatus, Snapshot, TrackedMessage,
};
