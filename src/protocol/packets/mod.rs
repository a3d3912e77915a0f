//! Packet definitions and codecs.

pub mod codec;
pub mod opcodes;

pub use codec::*;
pub use opcodes::*;
