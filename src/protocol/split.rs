//! Reassembly of multi-packet (split) replies.
//!
//! Source engine split fragments look like
//! `FF FF FF FE | id:i32 | total:u8 | number:u8 | size:u16 | payload`.
//! The concatenated payloads form an ordinary simple-header reply.

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::common::error::{ProtocolError, ProtocolResult};
use crate::protocol::packets::{ensure, read_i32, read_u16, read_u8, SIMPLE_HEADER, SPLIT_HEADER};

/// Collects fragments of one split reply.
#[derive(Debug, Default)]
pub struct SplitAssembler {
    id: Option<i32>,
    parts: Vec<Option<Bytes>>,
}

impl SplitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one datagram. Returns the full reply once every fragment has arrived.
    pub fn push(&mut self, mut datagram: Bytes) -> ProtocolResult<Option<Bytes>> {
        ensure(&datagram, 4)?;
        let header = (&datagram[..4]).get_i32_le();

        if header == SIMPLE_HEADER {
            return Ok(Some(datagram));
        }
        if header != SPLIT_HEADER {
            return Err(ProtocolError::UnexpectedHeader(header as u32));
        }

        datagram.advance(4);
        let id = read_i32(&mut datagram)?;
        if id < 0 {
            // High bit set: bzip2 compressed payload.
            return Err(ProtocolError::CompressedSplit);
        }
        let total = read_u8(&mut datagram)?;
        let number = read_u8(&mut datagram)?;
        let _size = read_u16(&mut datagram)?;

        if total == 0 || number >= total {
            return Err(ProtocolError::InvalidSplit {
                message: format!("fragment {} of {}", number, total),
            });
        }

        if self.id != Some(id) || self.parts.len() != total as usize {
            if self.id.is_some() {
                debug!("Discarding incomplete split reply {:?}, new id {}", self.id, id);
            }
            self.id = Some(id);
            self.parts = vec![None; total as usize];
        }

        self.parts[number as usize] = Some(datagram);

        if self.parts.iter().any(Option::is_none) {
            return Ok(None);
        }

        let mut joined = BytesMut::new();
        for part in self.parts.drain(..).flatten() {
            joined.extend_from_slice(&part);
        }
        self.id = None;
        Ok(Some(joined.freeze()))
    }
}
