//! Discord side of the bot.
//!
//! Rendering of the status board, the publishing policy, and the serenity
//! REST client that carries it out.

pub mod client;
pub mod dashboard;
pub mod publisher;
pub mod store;

pub use client::DiscordSink;
pub use dashboard::{RenderedPayload, Renderer};
pub use publisher::{MessageSink, PublishOutcome, Publisher};
pub use store::MessageStore;
