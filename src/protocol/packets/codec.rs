//! Packet encoding and decoding traits, plus checked readers for reply payloads.

use bytes::{Buf, Bytes, BytesMut};

use crate::common::error::{ProtocolError, ProtocolResult};

/// Header of a reply that fits in one datagram.
pub const SIMPLE_HEADER: i32 = -1;

/// Header of one fragment of a split reply.
pub const SPLIT_HEADER: i32 = -2;

/// A single-datagram A2S packet: `FF FF FF FF`, a type byte and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: u8,
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet with the given type byte and payload.
    pub fn new(kind: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Split a reassembled simple-header datagram into type and payload.
    pub fn parse(mut data: Bytes) -> ProtocolResult<Self> {
        ensure(&data, 5)?;
        let header = data.get_i32_le();
        if header != SIMPLE_HEADER {
            return Err(ProtocolError::UnexpectedHeader(header as u32));
        }
        let kind = data.get_u8();
        Ok(Self {
            kind,
            payload: data,
        })
    }

    /// Serialize with the simple header in front.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5 + self.payload.len());
        buf.extend_from_slice(&SIMPLE_HEADER.to_le_bytes());
        buf.extend_from_slice(&[self.kind]);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

/// Trait for request types that can be encoded into a datagram.
pub trait PacketEncode {
    fn encode(&self, buf: &mut BytesMut);
}

/// Trait for reply types that can be decoded from a packet payload.
pub trait PacketDecode: Sized {
    /// Reply type byte this decoder understands.
    const KIND: u8;

    fn decode(buf: &mut Bytes) -> ProtocolResult<Self>;

    /// Check the type byte, then decode the payload.
    fn from_packet(packet: Packet) -> ProtocolResult<Self> {
        if packet.kind != Self::KIND {
            return Err(ProtocolError::UnexpectedResponse {
                expected: Self::KIND,
                actual: packet.kind,
            });
        }
        let mut payload = packet.payload;
        Self::decode(&mut payload)
    }
}

/// Fail with `PacketTooShort` unless `needed` bytes remain.
pub fn ensure(buf: &Bytes, needed: usize) -> ProtocolResult<()> {
    if buf.remaining() < needed {
        return Err(ProtocolError::PacketTooShort {
            needed,
            got: buf.remaining(),
        });
    }
    Ok(())
}

pub fn read_u8(buf: &mut Bytes) -> ProtocolResult<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_i16(buf: &mut Bytes) -> ProtocolResult<i16> {
    ensure(buf, 2)?;
    Ok(buf.get_i16_le())
}

pub fn read_u16(buf: &mut Bytes) -> ProtocolResult<u16> {
    ensure(buf, 2)?;
    Ok(buf.get_u16_le())
}

pub fn read_i32(buf: &mut Bytes) -> ProtocolResult<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32_le())
}

pub fn read_u64(buf: &mut Bytes) -> ProtocolResult<u64> {
    ensure(buf, 8)?;
    Ok(buf.get_u64_le())
}

pub fn read_f32(buf: &mut Bytes) -> ProtocolResult<f32> {
    ensure(buf, 4)?;
    Ok(buf.get_f32_le())
}

/// Read a null-terminated string.
///
/// Servers are free to send any bytes, so invalid UTF-8 is replaced rather
/// than rejected.
pub fn read_cstring(buf: &mut Bytes) -> ProtocolResult<String> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::UnterminatedString)?;
    let raw = buf.split_to(end);
    buf.advance(1);
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
