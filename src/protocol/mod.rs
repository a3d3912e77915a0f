//! A2S (Source engine server query) protocol.
//!
//! - `packets`: framing, codec traits and type bytes
//! - `info` / `players`: request encoders and reply decoders
//! - `split`: multi-packet reply reassembly
//! - `query`: the UDP client that ties them together

pub mod info;
pub mod packets;
pub mod players;
pub mod query;
pub mod split;

pub use query::QueryClient;
